// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Background refresh of balloon and wind data.
//!
//! A dedicated thread owns a tokio runtime and runs fetch cycles on request
//! (and optionally on a timer). Results are published through shared state
//! that the UI thread polls every frame.

use log::{error, info, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use windborne_client::{Client, ClientConfig, ClientError, RefreshReport};

use crate::status::SharedSystemStatus;

/// Progress of the refresh pipeline as seen by the UI
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    /// Nothing requested yet
    Idle,
    /// A cycle is running
    Loading,
    /// The last cycle completed
    Loaded,
    /// The last cycle could not load balloon data
    Failed(String),
}

#[derive(Debug)]
struct Shared {
    state: LoadState,
    /// Most recent successful cycle, kept while a new one runs
    latest: Option<Arc<RefreshReport>>,
    /// Bumped every time `latest` is replaced
    generation: u64,
}

/// Handle to the background refresh thread
#[derive(Debug)]
pub struct Loader {
    shared: Arc<Mutex<Shared>>,
    refresh_tx: mpsc::UnboundedSender<()>,
    cancel_token: CancellationToken,
}

impl Loader {
    /// Start the refresh thread; the first cycle runs immediately
    pub fn spawn(
        config: ClientConfig,
        interval: Option<Duration>,
        status: SharedSystemStatus,
        ctx: egui::Context,
    ) -> Self {
        let shared = Arc::new(Mutex::new(Shared {
            state: LoadState::Idle,
            latest: None,
            generation: 0,
        }));
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();

        match Client::new(config) {
            Ok(client) => {
                let shared_clone = shared.clone();
                let cancel_clone = cancel_token.clone();

                info!("Starting refresh thread");
                std::thread::spawn(move || {
                    let rt = match tokio::runtime::Builder::new_multi_thread()
                        .enable_all()
                        .build()
                    {
                        Ok(rt) => rt,
                        Err(e) => {
                            error!("Failed to start tokio runtime: {}", e);
                            set_state(&shared_clone, LoadState::Failed(e.to_string()));
                            return;
                        }
                    };

                    rt.block_on(refresh_loop(
                        client,
                        interval,
                        refresh_rx,
                        shared_clone,
                        status,
                        ctx,
                        cancel_clone,
                    ));
                });
            }
            Err(e) => {
                error!("Failed to create feed client: {}", e);
                let message = e.to_string();
                status.lock().unwrap().refresh_failed(&message);
                set_state(&shared, LoadState::Failed(message));
            }
        }

        Self {
            shared,
            refresh_tx,
            cancel_token,
        }
    }

    /// Ask for a new cycle; ignored while one is already running
    pub fn request_refresh(&self) {
        if self.state() == LoadState::Loading {
            return;
        }
        if self.refresh_tx.send(()).is_err() {
            warn!("Refresh requested but the refresh thread has stopped");
        }
    }

    pub fn state(&self) -> LoadState {
        self.shared.lock().unwrap().state.clone()
    }

    /// Latest successful report and its generation number
    pub fn latest(&self) -> Option<(u64, Arc<RefreshReport>)> {
        let shared = self.shared.lock().unwrap();
        shared.latest.clone().map(|report| (shared.generation, report))
    }

    /// Stop the refresh thread
    pub fn shutdown(&self) {
        info!("Stopping refresh thread");
        self.cancel_token.cancel();
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

fn set_state(shared: &Mutex<Shared>, state: LoadState) {
    shared.lock().unwrap().state = state;
}

async fn refresh_loop(
    client: Client,
    interval: Option<Duration>,
    mut refresh_rx: mpsc::UnboundedReceiver<()>,
    shared: Arc<Mutex<Shared>>,
    status: SharedSystemStatus,
    ctx: egui::Context,
    cancel_token: CancellationToken,
) {
    loop {
        run_cycle(&client, &shared, &status).await;
        ctx.request_repaint();

        let timer = async {
            match interval {
                Some(period) => tokio::time::sleep(period).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("Refresh thread cancelled");
                break;
            }
            request = refresh_rx.recv() => {
                if request.is_none() {
                    break;
                }
            }
            () = timer => {
                info!("Automatic refresh");
            }
        }
    }
}

async fn run_cycle(client: &Client, shared: &Mutex<Shared>, status: &SharedSystemStatus) {
    set_state(shared, LoadState::Loading);
    status.lock().unwrap().refresh_started();

    publish(shared, status, client.refresh().await);
}

/// Record the outcome of a cycle; a failure keeps the previous report
fn publish(shared: &Mutex<Shared>, status: &SharedSystemStatus, result: Result<RefreshReport, ClientError>) {
    match result {
        Ok(report) => {
            status.lock().unwrap().refresh_succeeded(&report);
            let mut shared = shared.lock().unwrap();
            shared.latest = Some(Arc::new(report));
            shared.generation += 1;
            shared.state = LoadState::Loaded;
        }
        Err(e) => {
            error!("Error loading data: {}", e);
            let message = e.to_string();
            status.lock().unwrap().refresh_failed(&message);
            set_state(shared, LoadState::Failed(message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SystemStatus;
    use chrono::Utc;
    use windborne_client::{Constellation, FeedFormat, TreasureFormat, WindBatch};

    fn shared() -> Mutex<Shared> {
        Mutex::new(Shared {
            state: LoadState::Idle,
            latest: None,
            generation: 0,
        })
    }

    fn report(balloons: usize) -> RefreshReport {
        let fetched_at = Utc::now();
        let body = serde_json::to_vec(&vec![[10.0, 20.0, 15.0]; balloons]).unwrap();
        let mut constellation = Constellation::new(fetched_at);
        constellation.insert_hour(0, Ok(TreasureFormat::new().parse(&body, 0, fetched_at).unwrap()));
        RefreshReport {
            constellation,
            wind: WindBatch::default(),
            sampled: 0,
            duration: Duration::from_millis(10),
        }
    }

    fn failure() -> ClientError {
        ClientError::NoSnapshots { attempted: 24 }
    }

    #[test]
    fn test_success_publishes_report() {
        let shared = shared();
        let status = Arc::new(Mutex::new(SystemStatus::new()));

        publish(&shared, &status, Ok(report(3)));

        let shared = shared.lock().unwrap();
        assert_eq!(shared.state, LoadState::Loaded);
        assert_eq!(shared.generation, 1);
        assert_eq!(shared.latest.as_ref().map(|r| r.constellation.len()), Some(3));
    }

    #[test]
    fn test_failure_keeps_previous_report() {
        let shared = shared();
        let status = Arc::new(Mutex::new(SystemStatus::new()));

        publish(&shared, &status, Ok(report(2)));
        publish(&shared, &status, Err(failure()));

        let shared = shared.lock().unwrap();
        assert!(matches!(&shared.state, LoadState::Failed(msg) if msg.contains("no balloon snapshots")));
        assert_eq!(shared.generation, 1);
        assert_eq!(shared.latest.as_ref().map(|r| r.constellation.len()), Some(2));
    }

    #[test]
    fn test_failure_before_any_success_has_no_report() {
        let shared = shared();
        let status = Arc::new(Mutex::new(SystemStatus::new()));

        publish(&shared, &status, Err(failure()));

        let shared = shared.lock().unwrap();
        assert!(matches!(shared.state, LoadState::Failed(_)));
        assert_eq!(shared.generation, 0);
        assert!(shared.latest.is_none());
    }

    #[test]
    fn test_each_success_bumps_generation() {
        let shared = shared();
        let status = Arc::new(Mutex::new(SystemStatus::new()));

        publish(&shared, &status, Ok(report(1)));
        publish(&shared, &status, Err(failure()));
        publish(&shared, &status, Ok(report(4)));

        let shared = shared.lock().unwrap();
        assert_eq!(shared.state, LoadState::Loaded);
        assert_eq!(shared.generation, 2);
        assert_eq!(shared.latest.as_ref().map(|r| r.constellation.len()), Some(4));
    }
}
