use core::fmt::Write as _;

use serde_json::Value;
use thiserror::Error;

use crate::ast::Micheline;

#[derive(Debug, Error)]
pub enum Error {
    #[error("document is not a Micheline expression: {0}")]
    NotMicheline(#[source] serde_json::Error),
}

/// Renders a storage value or call parameter to textual Michelson.
pub fn render_expression(value: &Value) -> Result<String, Error> {
    parse(value).map(|node| render(&node))
}

/// Renders a `parameter`/`storage`/`code` script triple. Each section of
/// the top-level sequence becomes one `section args;` line.
pub fn render_schema(value: &Value) -> Result<String, Error> {
    let node = parse(value)?;

    let rendered = match node {
        Micheline::Sequence(sections) => sections
            .iter()
            .map(|section| format!("{};", render(section)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => render(&other),
    };

    Ok(rendered)
}

fn parse(value: &Value) -> Result<Micheline, Error> {
    serde_json::from_value(value.clone()).map_err(Error::NotMicheline)
}

fn render(node: &Micheline) -> String {
    match node {
        Micheline::Int { int } => int.clone(),
        Micheline::String { string } => format!("{string:?}"),
        Micheline::Bytes { bytes } => format!("0x{bytes}"),
        Micheline::Sequence(elements) => render_sequence(elements),
        Micheline::Application { prim, args, annots } => {
            let mut rendered = prim.clone();

            for annot in annots {
                write!(&mut rendered, " {annot}").expect("writing to a string cannot fail");
            }

            for arg in args {
                write!(&mut rendered, " {}", render_argument(arg))
                    .expect("writing to a string cannot fail");
            }

            rendered
        }
    }
}

fn render_argument(node: &Micheline) -> String {
    if node.needs_grouping() {
        format!("({})", render(node))
    } else {
        render(node)
    }
}

fn render_sequence(elements: &[Micheline]) -> String {
    if elements.is_empty() {
        return "{}".to_owned();
    }

    let rendered = elements.iter().map(render).collect::<Vec<_>>().join(" ; ");

    format!("{{ {rendered} }}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    #[test_case(json!({ "int": "42" }), "42"; "integer literal")]
    #[test_case(json!({ "string": "tezos" }), "\"tezos\""; "string literal")]
    #[test_case(json!({ "bytes": "deadbeef" }), "0xdeadbeef"; "bytes literal")]
    #[test_case(json!({ "prim": "Unit" }), "Unit"; "bare primitive")]
    #[test_case(
        json!({ "prim": "Pair", "args": [{ "int": "1" }, { "prim": "Some", "args": [{ "int": "2" }] }] }),
        "Pair 1 (Some 2)";
        "nested application is parenthesized"
    )]
    #[test_case(
        json!({ "prim": "pair", "args": [{ "prim": "int" }], "annots": ["%count"] }),
        "pair %count int";
        "annotations precede arguments"
    )]
    #[test_case(json!([]), "{}"; "empty sequence")]
    #[test_case(
        json!([{ "prim": "CDR" }, { "prim": "NIL", "args": [{ "prim": "operation" }] }, { "prim": "PAIR" }]),
        "{ CDR ; NIL operation ; PAIR }";
        "instruction sequence"
    )]
    fn expressions_render_to_michelson(value: Value, expected: &str) -> Result<(), Error> {
        assert_eq!(render_expression(&value)?, expected);
        Ok(())
    }

    #[test]
    fn schema_renders_one_line_per_section() -> Result<(), Error> {
        let script = json!([
            { "prim": "parameter", "args": [{ "prim": "unit" }] },
            { "prim": "storage", "args": [{ "prim": "unit" }] },
            {
                "prim": "code",
                "args": [[
                    { "prim": "CDR" },
                    { "prim": "NIL", "args": [{ "prim": "operation" }] },
                    { "prim": "PAIR" }
                ]]
            }
        ]);

        assert_eq!(
            render_schema(&script)?,
            "parameter unit;\nstorage unit;\ncode { CDR ; NIL operation ; PAIR };",
        );

        Ok(())
    }

    #[test]
    fn non_micheline_document_is_rejected() {
        render_expression(&json!({ "not": "micheline" }))
            .expect_err("an unrecognized shape should not render");
    }
}
