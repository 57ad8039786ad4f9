use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::bridge::error::BridgeError;
use crate::host::{Host, script};

use super::HandlerResult;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecuteCodeParams {
    #[serde(alias = "source")]
    pub code: String,
}

/// Run user code in the host scripting environment. A script that raises
/// becomes an `ExecutionError`; the host keeps running.
pub fn execute_code(host: &mut Host, params: ExecuteCodeParams) -> HandlerResult {
    debug!(bytes = params.code.len(), "executing script");
    match script::run(&mut host.scene, &params.code) {
        Ok(output) => Ok(json!({ "executed": true, "output": output })),
        Err(e) => Err(BridgeError::Execution(e.message)),
    }
}
