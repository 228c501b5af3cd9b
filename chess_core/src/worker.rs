use crate::engine::config::EngineConfig;
use crate::engine::search::AlphaBetaEngine;
use crate::engine::{SearchRequest, SearchResponse, SearchStats};
use gloo_worker::{HandlerId, Worker, WorkerScope};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Input {
    ComputeMove(SearchRequest, EngineConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Output {
    MoveFound(SearchResponse),
}

/// Background searcher for the browser. Runs one request at a time and
/// answers every request, echoing its id so the caller can drop stale ones.
#[derive(Default)]
pub struct SearchWorker {
    engine: Option<AlphaBetaEngine>,
}

impl SearchWorker {
    pub fn handle(&mut self, msg: Input) -> Output {
        match msg {
            Input::ComputeMove(request, config) => {
                let config = Arc::new(config);
                if let Some(engine) = &mut self.engine {
                    engine.update_config(config.clone());
                }
                let engine = self
                    .engine
                    .get_or_insert_with(|| AlphaBetaEngine::new(config));

                log::debug!("Worker received request {}", request.request_id);

                // No cancel flag is wired in here, so `None` only guards the protocol.
                let response = engine.respond(&request).unwrap_or(SearchResponse {
                    request_id: request.request_id,
                    best_move: None,
                    evaluation: 0,
                    stats: SearchStats::default(),
                });
                Output::MoveFound(response)
            }
        }
    }
}

impl Worker for SearchWorker {
    type Input = Input;
    type Message = ();
    type Output = Output;

    fn create(_scope: &WorkerScope<Self>) -> Self {
        Self::default()
    }

    fn update(&mut self, _scope: &WorkerScope<Self>, _msg: Self::Message) {}

    fn received(&mut self, scope: &WorkerScope<Self>, msg: Self::Input, id: HandlerId) {
        let output = self.handle(msg);
        scope.respond(id, output);
    }
}
