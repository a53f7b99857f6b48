// switchboard-client/examples/status_monitor.rs
// Signs in and logs the department status board as it changes
//
// SWITCHBOARD_EMAIL / SWITCHBOARD_PASSWORD are only needed when no stored
// session is available.

use std::sync::Arc;

use anyhow::Context;

use switchboard_client::logger;
use switchboard_client::views::DashboardView;
use switchboard_client::{ApiClient, AuthFlow, ClientConfig, HistoryNavigator, SessionStore, ViewContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = ClientConfig::from_env();
    logger::init_from_config(&config);

    let navigator = Arc::new(HistoryNavigator::new());
    let session = SessionStore::from_config(&config, navigator.clone());
    let restored = session.initialize();
    let api = ApiClient::from_config(&config, session.clone())?;

    if !restored.is_authenticated() {
        let email = std::env::var("SWITCHBOARD_EMAIL").context("SWITCHBOARD_EMAIL not set and no stored session")?;
        let password = std::env::var("SWITCHBOARD_PASSWORD").context("SWITCHBOARD_PASSWORD not set")?;
        let route = AuthFlow::new(api.clone()).login(&email, &password).await?;
        tracing::info!(route = %route, "Logged in");
    }

    let view = DashboardView::open(ViewContext::new(api.clone(), config))?;
    tracing::info!(user = %view.session().display_name(), "Watching department board (Ctrl+C to quit)");

    let mut updates = view.subscribe();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if let Some(error) = state.error {
                    tracing::warn!(error = %error, "Board refresh failed");
                }
                for row in view.rendered_rows() {
                    tracing::info!(
                        name = %row.row.full_name(),
                        extension = %row.row.extension_number,
                        status = %row.row.status_name,
                        updated = %row.updated.relative,
                        "Board row"
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    view.close();
    session.shutdown();
    Ok(())
}
