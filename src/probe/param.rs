//! Parameter injection
//!
//! Rebuilds a request body from an ordered parameter set with one value
//! substituted. Separator conventions come from a parser keyed by the
//! request's destination, so the engine never hard-codes `=`/`&`.

use crate::http::{Parameter, ProbeRequest};

/// Destination-specific parameter serialization conventions.
pub trait ParameterParser: Send + Sync {
    fn key_value_separator(&self) -> &str;
    fn pair_separator(&self) -> &str;
}

/// Standard `application/x-www-form-urlencoded` conventions.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormParameterParser;

impl ParameterParser for FormParameterParser {
    fn key_value_separator(&self) -> &str {
        "="
    }

    fn pair_separator(&self) -> &str {
        "&"
    }
}

/// Serialize the parameter set unchanged.
pub fn serialize_params(params: &[Parameter], parser: &dyn ParameterParser) -> String {
    encode_pairs(params, None, parser)
}

/// Serialize `params` with `value` substituted for every parameter
/// named `target`.
///
/// Matching is by name string equality, so duplicate-named parameters
/// all receive the substitution. The replacement is percent-encoded
/// unless the caller marks it as already escaped; all other values are
/// re-encoded from their decoded form.
pub fn serialize_with_value(
    params: &[Parameter],
    target: &str,
    value: &str,
    pre_encoded: bool,
    parser: &dyn ParameterParser,
) -> String {
    let encoded = if pre_encoded {
        value.to_string()
    } else {
        urlencoding::encode(value).into_owned()
    };

    if params.is_empty() {
        // No original query string: the body is the candidate alone.
        return encoded;
    }

    encode_pairs(params, Some((target, encoded.as_str())), parser)
}

/// Write the substituted body into a cloned request and keep its
/// Content-Length in step.
pub fn inject_parameter(
    request: &mut ProbeRequest,
    target: &str,
    value: &str,
    pre_encoded: bool,
    parser: &dyn ParameterParser,
) {
    let body = serialize_with_value(&request.form_params, target, value, pre_encoded, parser);
    request.set_body(body);
}

fn encode_pairs(
    params: &[Parameter],
    substitute: Option<(&str, &str)>,
    parser: &dyn ParameterParser,
) -> String {
    let mut pairs = Vec::with_capacity(params.len());
    for param in params {
        let value = match substitute {
            Some((target, replacement)) if param.name == target => replacement.to_string(),
            _ => urlencoding::encode(&param.value).into_owned(),
        };
        pairs.push(format!(
            "{}{}{}",
            urlencoding::encode(&param.name),
            parser.key_value_separator(),
            value
        ));
    }
    pairs.join(parser.pair_separator())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<Parameter> {
        pairs.iter().map(|(n, v)| Parameter::new(*n, *v)).collect()
    }

    #[test]
    fn substitutes_target_in_original_order() {
        let params = params(&[("a", "1"), ("b", "2")]);
        let body = serialize_with_value(&params, "b", "X", false, &FormParameterParser);
        assert_eq!(body, "a=1&b=X");
    }

    #[test]
    fn empty_parameter_set_yields_value_alone() {
        let body = serialize_with_value(&[], "any", "X", false, &FormParameterParser);
        assert_eq!(body, "X");
    }

    #[test]
    fn duplicate_names_all_receive_the_substitution() {
        // Matching is by name value, not identity of the pair.
        let params = params(&[("id", "1"), ("id", "2"), ("other", "3")]);
        let body = serialize_with_value(&params, "id", "X", false, &FormParameterParser);
        assert_eq!(body, "id=X&id=X&other=3");
    }

    #[test]
    fn replacement_is_percent_encoded_unless_marked_escaped() {
        let params = params(&[("q", "old value")]);

        let body = serialize_with_value(&params, "q", "a b", false, &FormParameterParser);
        assert_eq!(body, "q=a%20b");

        let body = serialize_with_value(&params, "q", "a%20b", true, &FormParameterParser);
        assert_eq!(body, "q=a%20b");
    }

    #[test]
    fn untouched_values_are_reencoded() {
        let params = params(&[("note", "a b"), ("pin", "0")]);
        let body = serialize_with_value(&params, "pin", "A", false, &FormParameterParser);
        assert_eq!(body, "note=a%20b&pin=A");
    }

    #[test]
    fn inject_writes_body_and_content_length() {
        let mut request = ProbeRequest::builder()
            .method("POST")
            .url("http://target.local/login")
            .form_param("user", "admin")
            .form_param("pin", "0000")
            .build();

        inject_parameter(&mut request, "pin", "A", false, &FormParameterParser);

        assert_eq!(request.body.as_deref(), Some("user=admin&pin=A"));
        assert_eq!(request.header("Content-Length"), Some("16"));
    }

    #[test]
    fn plain_serialization_round_trips_the_set() {
        let params = params(&[("a", "1"), ("b", "2")]);
        assert_eq!(serialize_params(&params, &FormParameterParser), "a=1&b=2");
    }
}
