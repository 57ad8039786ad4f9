#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use scenebridge::bridge::{BridgeClient, BridgeServer, CommandDispatcher, MainThreadScheduler};
use scenebridge::host::layout::Layout;
use scenebridge::host::scene::Scene;
use scenebridge::host::{Host, HostApp};

/// A bridge wired to a real host loop running on its own thread
pub struct TestBridge {
    pub addr: SocketAddr,
    pub scheduler: MainThreadScheduler,
    stop: Arc<AtomicBool>,
    host_thread: Option<thread::JoinHandle<()>>,
    server_task: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestBridge {
    pub async fn start(host: Host) -> Self {
        let scheduler = MainThreadScheduler::new();
        let server = BridgeServer::bind("127.0.0.1", 0, scheduler.clone(), 1 << 20)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let server_task = tokio::spawn(server.run());

        let stop = Arc::new(AtomicBool::new(false));
        let host_thread = {
            let stop = Arc::clone(&stop);
            let scheduler = scheduler.clone();
            thread::spawn(move || {
                let mut app = HostApp::new(host, scheduler, CommandDispatcher::default());
                app.run(&stop, Duration::from_millis(1));
            })
        };

        Self {
            addr,
            scheduler,
            stop,
            host_thread: Some(host_thread),
            server_task,
        }
    }

    /// Bridge over the default startup scene with a 3D viewport
    pub async fn with_viewport() -> Self {
        Self::start(Host::new(Scene::startup(), Layout::with_viewport(320, 240))).await
    }

    /// Bridge over a host that has no 3D viewport
    pub async fn headless() -> Self {
        Self::start(Host::new(Scene::startup(), Layout::headless())).await
    }

    pub async fn client(&self) -> BridgeClient {
        BridgeClient::connect(self.addr).await.unwrap()
    }

    /// Stop the host loop and wait for it to exit
    pub fn stop_host(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.host_thread.take() {
            handle.join().unwrap();
        }
    }
}

impl Drop for TestBridge {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.server_task.abort();
    }
}
