//! Top-level orchestrator: one capture session per configured interface.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::capture::{CaptureBackend, CaptureError};
use crate::config::{Config, ListenSpec};
use crate::executor::CommandRunner;
use crate::logging::Logger;
use crate::power::PowerDispatcher;
use crate::resolver::DescriptorResolver;
use crate::session::{CaptureSession, Pipeline};

/// How one capture session ended.
#[derive(Debug)]
pub struct SessionExit {
    /// Interface the session captured on.
    pub interface: String,
    /// `Ok` when the source ran dry, otherwise the fatal capture error.
    pub result: Result<(), CaptureError>,
}

/// Spawns and joins capture sessions.
pub struct Server {
    listeners: Vec<ListenSpec>,
    backend: Arc<dyn CaptureBackend>,
    pipeline: Arc<Pipeline>,
    logger: Logger,
}

impl Server {
    /// Build a server from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration lists no interfaces to listen on.
    pub fn new(
        config: &Config,
        backend: Arc<dyn CaptureBackend>,
        runner: Arc<dyn CommandRunner>,
        logger: Logger,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !config.listen.is_empty(),
            "no listen interfaces configured, refusing to start"
        );

        let resolver = DescriptorResolver::new(config.descriptor_dirs.clone());
        let dispatcher = PowerDispatcher::new(runner, logger.clone());
        let pipeline = Arc::new(Pipeline::new(resolver, dispatcher, logger.clone()));

        Ok(Self {
            listeners: config.listen.clone(),
            backend,
            pipeline,
            logger,
        })
    }

    /// Run every session and wait until all of them have exited.
    ///
    /// With a single interface the session runs on the caller's task;
    /// otherwise each session gets its own task. Either way this returns
    /// only after every session has ended, in completion order.
    pub async fn run(self) -> Vec<SessionExit> {
        let mut sessions: Vec<CaptureSession> = self
            .listeners
            .into_iter()
            .map(|spec| {
                CaptureSession::new(
                    spec,
                    Arc::clone(&self.backend),
                    Arc::clone(&self.pipeline),
                    self.logger.clone(),
                )
            })
            .collect();

        if sessions.len() == 1 {
            if let Some(session) = sessions.pop() {
                let exit = run_session(session).await;
                report_exit(&self.logger, &exit);
                return vec![exit];
            }
        }

        let mut set = JoinSet::new();
        for session in sessions {
            set.spawn(run_session(session));
        }

        let mut exits = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(exit) => {
                    report_exit(&self.logger, &exit);
                    exits.push(exit);
                }
                Err(e) => self
                    .logger
                    .error(format!("capture session task failed: {e}")),
            }
        }
        exits
    }
}

async fn run_session(session: CaptureSession) -> SessionExit {
    let interface = session.interface().to_owned();
    let result = session.run().await;
    SessionExit { interface, result }
}

fn report_exit(logger: &Logger, exit: &SessionExit) {
    match &exit.result {
        Ok(()) => logger.info(format!(
            "Capture session on interface {} ended",
            exit.interface
        )),
        Err(e) => logger.error(format!(
            "capture session on interface {} stopped: {e}",
            exit.interface
        )),
    }
}
