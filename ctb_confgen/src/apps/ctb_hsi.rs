//! CTB hardware-signals-interface application.

use crate::ConfgenResult;
use crate::graph::{App, DaqModule, Endpoint, ModuleGraph, Queue};
use crate::merge::update_triggers;
use crate::schema::confgen::{CtbHsiConf, ReadoutParams};
use crate::schema::{ctbmodule, readout};

const HANDLER_PLUGIN: &str = "HSIDataLinkHandler";
const SUBSYSTEM: &str = "HW_Signals_Interface";
const RAW_QUEUE_CAPACITY: usize = 100_000;

/// One of the two trigger streams read out from the board.
struct Stream {
    level: &'static str,
    source_id: u32,
}

impl Stream {
    fn handler(&self) -> String {
        format!("ctb_{}_datahandler", self.level)
    }
}

/// Builds the application controlling one CTB and reading out its LLT and
/// HLT streams.
///
/// The board configuration starts from the schema defaults; the trigger
/// lists in `ctb_hsi` are merged over them with [`update_triggers`] and the
/// random triggers are replaced when supplied. The app runs on
/// `ctb_hsi.host_ctb_hsi`, which is also where the board sends its readout.
///
/// # Errors
///
/// Returns an error when a module configuration cannot be serialised or the
/// resulting graph does not validate, for example when both streams share a
/// source id.
pub fn get_ctb_hsi_app(
    ctb_hsi: &CtbHsiConf,
    nickname: &str,
    params: &ReadoutParams,
) -> ConfgenResult<App> {
    tracing::info!(nickname, host = %ctb_hsi.host_ctb_hsi, "generating CTB HSI app");

    let board = board_config(ctb_hsi);
    let streams = [
        Stream {
            level: "llt",
            source_id: params.llt_source_id,
        },
        Stream {
            level: "hlt",
            source_id: params.hlt_source_id,
        },
    ];

    let mut modules = vec![DaqModule::new(
        nickname,
        "CTBModule",
        &ctbmodule::Conf {
            board_config: board,
            ..ctbmodule::Conf::default()
        },
    )?];
    let mut queues = Vec::with_capacity(streams.len());
    for stream in &streams {
        let handler = stream.handler();
        let conf = readout::Conf::for_source(
            stream.source_id,
            params.queue_pop_wait_ms,
            params.latency_buffer_size,
            params.data_request_timeout_ms,
        );
        modules.push(DaqModule::new(handler.as_str(), HANDLER_PLUGIN, &conf)?);
        queues.push(Queue::new(
            format!("{nickname}.{}_output", stream.level),
            format!("{handler}.raw_input"),
            "HSIFrame",
            format!("ctb_{}_link", stream.level),
            RAW_QUEUE_CAPACITY,
        ));
    }

    let mut graph = ModuleGraph::new(modules, queues);
    for stream in &streams {
        let handler = stream.handler();
        graph.add_fragment_producer(
            stream.source_id,
            SUBSYSTEM,
            format!("{handler}.request_input"),
            format!("{handler}.fragment_queue"),
        );
    }
    for stream in &streams {
        graph.add_endpoint(
            Endpoint::output(
                format!("timesync_ctb_{}", stream.level),
                format!("{}.timesync_output", stream.handler()),
                "TimeSync",
            )
            .pubsub()
            .without_toposort(),
        );
    }
    graph.add_endpoint(Endpoint::output(
        "ctb_hsievents",
        format!("{nickname}.hsievents"),
        "HSIEvent",
    ));
    graph.add_endpoint(Endpoint::subscriber("TimeSync"));

    let app = App::new(nickname, ctb_hsi.host_ctb_hsi.as_str(), graph)?;
    tracing::info!(nickname, "generated CTB HSI app");
    Ok(app)
}

fn board_config(ctb_hsi: &CtbHsiConf) -> ctbmodule::BoardConfig {
    let mut board = ctbmodule::BoardConfig::default();
    let ctb = &mut board.ctb;

    ctb.hlt.trigger = update_triggers(
        std::mem::take(&mut ctb.hlt.trigger),
        ctb_hsi.hlt_triggers.clone(),
    );
    let subsystems = &mut ctb.subsystems;
    subsystems.beam.triggers = update_triggers(
        std::mem::take(&mut subsystems.beam.triggers),
        ctb_hsi.beam_llt_triggers.clone(),
    );
    subsystems.crt.triggers = update_triggers(
        std::mem::take(&mut subsystems.crt.triggers),
        ctb_hsi.crt_llt_triggers.clone(),
    );
    subsystems.pds.triggers = update_triggers(
        std::mem::take(&mut subsystems.pds.triggers),
        ctb_hsi.pds_llt_triggers.clone(),
    );

    if let Some(fake) = &ctb_hsi.fake_trig_1 {
        ctb.misc.randomtrigger_1 = fake.clone();
    }
    if let Some(fake) = &ctb_hsi.fake_trig_2 {
        ctb.misc.randomtrigger_2 = fake.clone();
    }
    ctb.sockets.receiver.host.clone_from(&ctb_hsi.host_ctb_hsi);
    board
}
