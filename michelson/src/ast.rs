use serde::Deserialize;

/// The Micheline JSON AST: literals, primitive applications and
/// sequences. Integers stay textual; the chain allows arbitrary
/// precision.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(untagged)]
pub enum Micheline {
    Sequence(Vec<Micheline>),
    Int {
        int: String,
    },
    String {
        string: String,
    },
    Bytes {
        bytes: String,
    },
    Application {
        prim: String,
        #[serde(default)]
        args: Vec<Micheline>,
        #[serde(default)]
        annots: Vec<String>,
    },
}

impl Micheline {
    /// An application with arguments or annotations needs parentheses
    /// when it appears in argument position.
    pub(crate) fn needs_grouping(&self) -> bool {
        match self {
            Self::Application { args, annots, .. } => !args.is_empty() || !annots.is_empty(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn literals_and_applications_decode() {
        let node = serde_json::from_value::<Micheline>(json!({
            "prim": "Pair",
            "args": [{ "int": "42" }, { "string": "tezos" }],
            "annots": ["%wrapped"]
        }))
        .expect("application should decode");

        match node {
            Micheline::Application { prim, args, annots } => {
                assert_eq!(prim, "Pair");
                assert_eq!(args.len(), 2);
                assert_eq!(annots, vec!["%wrapped"]);
            }
            other => panic!("expected an application, got {other:?}"),
        }
    }

    #[test]
    fn sequences_decode_recursively() {
        let node = serde_json::from_value::<Micheline>(json!([
            { "prim": "CDR" },
            [{ "prim": "DUP" }],
        ]))
        .expect("sequence should decode");

        match node {
            Micheline::Sequence(elements) => assert_eq!(elements.len(), 2),
            other => panic!("expected a sequence, got {other:?}"),
        }
    }

    #[test]
    fn bare_json_strings_are_not_micheline() {
        serde_json::from_value::<Micheline>(json!("parameter unit;"))
            .expect_err("a bare string is not a Micheline node");
    }
}
