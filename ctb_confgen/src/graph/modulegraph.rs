//! Module graph of one application.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;

use super::module::{DaqModule, Endpoint, FragmentProducer, Queue, split_endpoint};
use crate::{ConfgenError, ConfgenResult};

/// Modules, queues, endpoints and fragment producers of one application.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleGraph {
    modules: Vec<DaqModule>,
    queues: Vec<Queue>,
    endpoints: Vec<Endpoint>,
    fragment_producers: Vec<FragmentProducer>,
}

impl ModuleGraph {
    /// Builds a graph from its modules and internal queues.
    #[must_use]
    pub const fn new(modules: Vec<DaqModule>, queues: Vec<Queue>) -> Self {
        Self {
            modules,
            queues,
            endpoints: Vec::new(),
            fragment_producers: Vec::new(),
        }
    }

    /// Registers a fragment producer answering requests on `requests_in`.
    pub fn add_fragment_producer(
        &mut self,
        source_id: u32,
        subsystem: impl Into<String>,
        requests_in: impl Into<String>,
        fragments_out: impl Into<String>,
    ) {
        self.fragment_producers.push(FragmentProducer {
            source_id,
            subsystem: subsystem.into(),
            requests_in: requests_in.into(),
            fragments_out: fragments_out.into(),
        });
    }

    /// Exposes an endpoint to other applications.
    pub fn add_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoints.push(endpoint);
    }

    /// Modules in declaration order.
    #[must_use]
    pub fn modules(&self) -> &[DaqModule] {
        &self.modules
    }

    /// Internal queues in declaration order.
    #[must_use]
    pub fn queues(&self) -> &[Queue] {
        &self.queues
    }

    /// Endpoints in declaration order.
    #[must_use]
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Fragment producers in declaration order.
    #[must_use]
    pub fn fragment_producers(&self) -> &[FragmentProducer] {
        &self.fragment_producers
    }

    /// Checks that every reference in the graph resolves.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfgenError::Graph`] naming `app` for duplicate module,
    /// queue, endpoint or source ids, malformed `module.endpoint` references,
    /// references to unknown modules, or a queue cycle.
    pub fn validate(&self, app: &str) -> ConfgenResult<()> {
        let names = self.module_names(app)?;
        self.check_queues(app, &names)?;
        self.check_endpoints(app, &names)?;
        self.check_fragment_producers(app, &names)?;
        self.topological_order(app).map(|_| ())
    }

    /// Module names in start order: consumers before the producers feeding
    /// them, declaration order otherwise. Stop order is the reverse.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfgenError::Graph`] when the queues form a cycle or
    /// reference unknown modules.
    pub fn module_start_order(&self, app: &str) -> ConfgenResult<Vec<&str>> {
        let mut order = self.topological_order(app)?;
        order.reverse();
        Ok(order)
    }

    fn module_names(&self, app: &str) -> ConfgenResult<HashSet<&str>> {
        let mut names = HashSet::with_capacity(self.modules.len());
        for module in &self.modules {
            if module.name.is_empty() || module.name.contains('.') {
                return Err(ConfgenError::graph(
                    app,
                    format!("invalid module name '{}'", module.name),
                ));
            }
            if !names.insert(module.name.as_str()) {
                return Err(ConfgenError::graph(
                    app,
                    format!("duplicate module name '{}'", module.name),
                ));
            }
        }
        Ok(names)
    }

    fn check_queues(&self, app: &str, names: &HashSet<&str>) -> ConfgenResult<()> {
        let mut queue_names = HashSet::with_capacity(self.queues.len());
        for queue in &self.queues {
            if !queue_names.insert(queue.name.as_str()) {
                return Err(ConfgenError::graph(
                    app,
                    format!("duplicate queue name '{}'", queue.name),
                ));
            }
            resolve(app, names, &queue.push)?;
            resolve(app, names, &queue.pop)?;
        }
        Ok(())
    }

    fn check_endpoints(&self, app: &str, names: &HashSet<&str>) -> ConfgenResult<()> {
        let mut external = HashSet::new();
        for endpoint in &self.endpoints {
            if let Some(internal) = endpoint.internal_name.as_deref() {
                resolve(app, names, internal)?;
            }
            if let Some(name) = endpoint.external_name.as_deref() {
                if !external.insert(name) {
                    return Err(ConfgenError::graph(
                        app,
                        format!("duplicate endpoint name '{name}'"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_fragment_producers(&self, app: &str, names: &HashSet<&str>) -> ConfgenResult<()> {
        let mut source_ids = HashSet::new();
        for producer in &self.fragment_producers {
            if !source_ids.insert(producer.source_id) {
                return Err(ConfgenError::graph(
                    app,
                    format!("duplicate fragment producer source id {}", producer.source_id),
                ));
            }
            resolve(app, names, &producer.requests_in)?;
            resolve(app, names, &producer.fragments_out)?;
        }
        Ok(())
    }

    /// Kahn's algorithm over the queue edges, producers first. Ready modules
    /// are taken in declaration order so the result is deterministic.
    fn topological_order(&self, app: &str) -> ConfgenResult<Vec<&str>> {
        let index: HashMap<&str, usize> = self
            .modules
            .iter()
            .enumerate()
            .map(|(idx, module)| (module.name.as_str(), idx))
            .collect();
        let mut indegree = vec![0_usize; self.modules.len()];
        let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); self.modules.len()];

        for queue in &self.queues {
            let from = module_index(app, &index, &queue.push)?;
            let to = module_index(app, &index, &queue.pop)?;
            if from == to {
                continue;
            }
            if let (Some(edges), Some(count)) = (consumers.get_mut(from), indegree.get_mut(to)) {
                edges.push(to);
                *count += 1;
            }
        }

        let mut ready: BTreeSet<usize> = indegree
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(idx, _)| idx)
            .collect();
        let mut order = Vec::with_capacity(self.modules.len());
        while let Some(next) = ready.pop_first() {
            if let Some(module) = self.modules.get(next) {
                order.push(module.name.as_str());
            }
            for &to in consumers.get(next).map(Vec::as_slice).unwrap_or_default() {
                if let Some(count) = indegree.get_mut(to) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(to);
                    }
                }
            }
        }

        if order.len() == self.modules.len() {
            Ok(order)
        } else {
            Err(ConfgenError::graph(app, "queues form a cycle"))
        }
    }
}

fn resolve<'a>(app: &str, names: &HashSet<&str>, reference: &'a str) -> ConfgenResult<&'a str> {
    let (module, _) = split_endpoint(reference).ok_or_else(|| {
        ConfgenError::graph(
            app,
            format!("'{reference}' is not a module.endpoint reference"),
        )
    })?;
    if names.contains(module) {
        Ok(module)
    } else {
        Err(ConfgenError::graph(
            app,
            format!("'{reference}' refers to unknown module '{module}'"),
        ))
    }
}

fn module_index(app: &str, index: &HashMap<&str, usize>, reference: &str) -> ConfgenResult<usize> {
    let module = split_endpoint(reference).map_or(reference, |(module, _)| module);
    index.get(module).copied().ok_or_else(|| {
        ConfgenError::graph(
            app,
            format!("'{reference}' refers to unknown module '{module}'"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    fn module(name: &str) -> DaqModule {
        DaqModule::new(name, "Dummy", &json!({})).expect("module")
    }

    #[fixture]
    fn chain() -> ModuleGraph {
        ModuleGraph::new(
            vec![module("source"), module("filter"), module("sink")],
            vec![
                Queue::new("source.out", "filter.in", "Frame", "q1", 10),
                Queue::new("filter.out", "sink.in", "Frame", "q2", 10),
            ],
        )
    }

    #[rstest]
    fn start_order_puts_consumers_first(chain: ModuleGraph) {
        let order = chain.module_start_order("app").expect("order");
        assert_eq!(order, vec!["sink", "filter", "source"]);
    }

    #[rstest]
    fn unconnected_modules_keep_reverse_declaration_order() {
        let graph = ModuleGraph::new(vec![module("a"), module("b")], Vec::new());
        assert_eq!(graph.module_start_order("app").expect("order"), vec!["b", "a"]);
    }

    #[rstest]
    fn valid_graph_passes(mut chain: ModuleGraph) {
        chain.add_endpoint(Endpoint::output("frames", "sink.out", "Frame"));
        chain.add_endpoint(Endpoint::subscriber("TimeSync"));
        chain.add_fragment_producer(1, "HW_Signals_Interface", "sink.request_input", "sink.fragment_queue");
        chain.validate("app").expect("valid graph");
    }

    #[rstest]
    fn duplicate_module_names_are_rejected() {
        let graph = ModuleGraph::new(vec![module("a"), module("a")], Vec::new());
        let err = graph.validate("app").expect_err("duplicate");
        assert!(err.to_string().contains("duplicate module name 'a'"));
    }

    #[rstest]
    #[case::unknown_module("ghost.out", "unknown module 'ghost'")]
    #[case::missing_separator("source", "not a module.endpoint reference")]
    fn bad_queue_references_are_rejected(#[case] push: &str, #[case] message: &str) {
        let graph = ModuleGraph::new(
            vec![module("source"), module("sink")],
            vec![Queue::new(push, "sink.in", "Frame", "q", 1)],
        );
        let err = graph.validate("app").expect_err("bad reference");
        assert!(err.to_string().contains(message), "{err}");
    }

    #[rstest]
    fn cycles_are_rejected() {
        let graph = ModuleGraph::new(
            vec![module("a"), module("b")],
            vec![
                Queue::new("a.out", "b.in", "Frame", "q1", 1),
                Queue::new("b.out", "a.in", "Frame", "q2", 1),
            ],
        );
        let err = graph.validate("app").expect_err("cycle");
        assert!(err.to_string().contains("cycle"));
    }

    #[rstest]
    fn duplicate_source_ids_are_rejected(mut chain: ModuleGraph) {
        chain.add_fragment_producer(3, "HW_Signals_Interface", "sink.a", "sink.b");
        chain.add_fragment_producer(3, "HW_Signals_Interface", "filter.a", "filter.b");
        let err = chain.validate("app").expect_err("duplicate source id");
        assert!(err.to_string().contains("source id 3"));
    }

    #[rstest]
    fn duplicate_external_names_are_rejected(mut chain: ModuleGraph) {
        chain.add_endpoint(Endpoint::output("frames", "sink.out", "Frame"));
        chain.add_endpoint(Endpoint::output("frames", "filter.out", "Frame"));
        let err = chain.validate("app").expect_err("duplicate endpoint");
        assert!(err.to_string().contains("duplicate endpoint name 'frames'"));
    }
}
