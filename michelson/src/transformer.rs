use log::{debug, error};
use serde_json::Value;
use types::{Account, Block, Operation};

use crate::render::{self, Error};

const UNPARSABLE_PREFIX: &str = "Unparsable code: ";

/// Rewrites a script triple field (`parameter`/`storage`/`code`) in
/// place. Parse failures leave the sentinel string instead; one
/// malformed script never aborts a page.
pub fn transform_schema(value: &mut Value) {
    transform_with(value, render::render_schema);
}

/// Rewrites a storage value or call parameter field in place.
pub fn transform_expression(value: &mut Value) {
    transform_with(value, render::render_expression);
}

/// Rewrites an origination's `{code, storage}` script object: the code
/// triple renders as a schema, the initial storage as an expression.
pub fn transform_script(value: &mut Value) {
    let Some(script) = value.as_object_mut() else {
        transform_schema(value);
        return;
    };

    if let Some(code) = script.get_mut("code") {
        transform_schema(code);
    }

    if let Some(storage) = script.get_mut("storage") {
        transform_expression(storage);
    }
}

/// Rewrites every Michelson payload reachable from a block: transaction
/// parameters and origination scripts across all operation groups.
#[must_use]
pub fn transform_block(mut block: Block) -> Block {
    for group in &mut block.operations {
        for operation in &mut group.contents {
            match operation {
                Operation::Transaction {
                    parameters: Some(parameters),
                    ..
                } => transform_expression(parameters),
                Operation::Origination {
                    script: Some(script),
                    ..
                } => transform_script(script),
                _ => {}
            }
        }
    }

    block
}

/// Rewrites a contract snapshot's script and storage payloads.
#[must_use]
pub fn transform_account(mut account: Account) -> Account {
    if let Some(script) = &mut account.script {
        transform_schema(script);
    }

    if let Some(storage) = &mut account.storage {
        transform_expression(storage);
    }

    account
}

fn transform_with(value: &mut Value, render: impl Fn(&Value) -> Result<String, Error>) {
    // Already-textual fields pass through untouched, which makes the
    // transformation idempotent.
    if value.is_string() {
        debug!("skipping already-textual Michelson field");
        return;
    }

    let rendered = match render(value) {
        Ok(text) => text,
        Err(parse_error) => {
            error!("failed to parse embedded Michelson: {parse_error}");
            format!("{UNPARSABLE_PREFIX}{value}")
        }
    };

    *value = Value::String(rendered);
}
