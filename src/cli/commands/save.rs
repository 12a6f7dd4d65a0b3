//! Save command - store the installation after a job

use super::{services, state_file};
use crate::config::Config;
use crate::error::TlsetupResult;
use crate::ui::{self, UiContext};
use crate::workflow;

/// Execute the save command
pub async fn execute(config: &Config) -> TlsetupResult<()> {
    let ctx = UiContext::detect();
    let state_file = state_file(config);
    if !state_file.exists() {
        ui::step_warn_hint(
            &ctx,
            "No installation recorded",
            "Run `tlsetup install` first",
        );
        return Ok(());
    }

    let services = services(config);
    workflow::save_cache(services.store.as_ref(), &state_file).await?;
    ui::step_ok(&ctx, "Cache phase finished");
    Ok(())
}
