//! Server assembly
//!
//! Wires the dispatcher, event hub and WebSocket router together and runs them
//! until the shutdown future resolves. On the way out the dispatcher stops the
//! motors and blanks the LEDs.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::dispatcher;
use crate::drivers::Actuators;
use crate::error::ServerError;
use crate::hub::EventHub;
use crate::transport::{self, AppState};

/// Bound but not yet running server
pub struct Server<A: Actuators> {
    config: ServerConfig,
    actuators: A,
    listener: TcpListener,
}

impl<A: Actuators + 'static> Server<A> {
    /// Bind the listen socket
    pub async fn bind(config: ServerConfig, actuators: A) -> Result<Self, ServerError> {
        config.validate()?;
        let listener = TcpListener::bind(config.bind)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind,
                source,
            })?;
        Ok(Self {
            config,
            actuators,
            listener,
        })
    }

    /// Actual bound address (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves, then clean up the actuators
    ///
    /// Returns the actuator backend once the dispatcher has stopped.
    pub async fn run<F>(self, shutdown: F) -> Result<A, ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let hub = EventHub::new(self.config.broadcast_capacity);
        let (control, dispatcher) = dispatcher::spawn(&self.config, self.actuators, hub.clone());
        let app = transport::router(AppState {
            control: control.clone(),
            hub,
        });

        crate::log_info!("Listening on ws://{}/ws", self.listener.local_addr()?);
        let served = axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        if let Err(e) = control.shutdown().await {
            crate::log_error!("Dispatcher did not shut down cleanly: {}", e);
        }
        let actuators = dispatcher
            .await
            .map_err(|e| ServerError::Dispatcher(e.to_string()))?;
        served?;
        Ok(actuators)
    }
}

/// Resolves on Ctrl-C
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        crate::log_error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    crate::log_info!("Ctrl-C received");
}
