//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Register configured routes
//! - Start the gateway listener, then the admin API
//!
//! # Design Decisions
//! - Fail fast: an invalid route or a bind failure aborts startup
//! - Routes are registered before the listener opens
//! - A metrics exporter failure is logged, not fatal

use std::net::SocketAddr;
use std::sync::Arc;

use crate::admin::{self, AdminState};
use crate::config::GatewayConfig;
use crate::error::Result;
use crate::http::{Gateway, ServerSettings};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// A started gateway together with its admin API.
pub struct Launched {
    gateway: Arc<Gateway>,
    gateway_addr: SocketAddr,
    admin_addr: Option<SocketAddr>,
    shutdown: Shutdown,
}

impl Launched {
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Address the gateway listener was bound to at startup.
    pub fn gateway_addr(&self) -> SocketAddr {
        self.gateway_addr
    }

    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin_addr
    }

    /// Stop the admin API and the gateway listener.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.trigger();
        self.gateway.stop().await
    }
}

pub async fn launch(config: &GatewayConfig) -> Result<Launched> {
    let observability = &config.observability;
    if observability.metrics_enabled {
        match observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let gateway = Arc::new(Gateway::new(ServerSettings::from(config)));
    for route in &config.routes {
        gateway.add_route(&route.method, &route.path, &route.target)?;
    }

    let gateway_addr = gateway.listen(&config.listener.host, config.listener.port).await?;

    let shutdown = Shutdown::new();
    let admin_addr = if config.admin.enabled {
        let state = AdminState::new(gateway.clone(), &config.admin.api_key);
        match admin::serve(state, &config.admin.bind_address, shutdown.signalled()).await {
            Ok(addr) => Some(addr),
            Err(e) => {
                gateway.stop().await?;
                return Err(e);
            }
        }
    } else {
        None
    };

    Ok(Launched {
        gateway,
        gateway_addr,
        admin_addr,
        shutdown,
    })
}
