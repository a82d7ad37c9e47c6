use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::handlers::api::{self, ApiContext};
use crate::service::calendar_service::{CalendarClient, GoogleCalendarService};
use crate::service::openai_service::{OpenAIService, PlanProposer};

/// Builds the collaborators once from the captured config and serves the
/// HTTP surface. Unconfigured collaborators leave their endpoints returning
/// config errors while /ping keeps reporting the flags.
pub async fn run_api(config: PlannerConfig) {
    let calendar: Option<Arc<dyn CalendarClient>> = match GoogleCalendarService::from_config(&config)
    {
        Ok(service) => Some(Arc::new(service)),
        Err(e) => {
            log::warn!("Calendar collaborator not available: {}", e);
            None
        }
    };
    let proposer: Option<Arc<dyn PlanProposer>> = match OpenAIService::from_config(&config) {
        Ok(service) => Some(Arc::new(service)),
        Err(e) => {
            log::warn!("Plan proposer not available: {}", e);
            None
        }
    };

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            log::error!("Invalid BIND_ADDR {}: {}", config.bind_addr, e);
            return;
        }
    };

    let ctx = Arc::new(ApiContext {
        config,
        calendar,
        proposer,
    });

    log::info!("Serving planner API on {}", addr);
    warp::serve(api::routes(ctx)).run(addr).await;
}
