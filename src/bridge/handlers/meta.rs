use serde_json::{Value, json};

use crate::bridge::dispatch::CATALOGUE;
use crate::host::Host;

use super::HandlerResult;

pub fn ping(host: &mut Host) -> HandlerResult {
    Ok(json!({ "pong": true, "frame": host.frame }))
}

pub fn help() -> HandlerResult {
    let commands: Vec<Value> = CATALOGUE
        .iter()
        .map(|spec| {
            let args: Vec<Value> = spec
                .args
                .iter()
                .map(|(name, required)| json!({ "name": name, "required": required }))
                .collect();
            json!({
                "name": spec.name,
                "aliases": spec.aliases,
                "description": spec.description,
                "args": args,
            })
        })
        .collect();
    Ok(json!({ "commands": commands }))
}
