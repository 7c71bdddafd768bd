//! Probe command parameter substitution.
//!
//! A probe template may reference earlier probe outputs with `#x` tokens,
//! where `x` is the index of the source probe. The sources a probe may use
//! are declared per probe in `command_params`.

use super::sanitize::AssertionTemplate;
use super::CapturedValue;
use serde::{Deserialize, Serialize};

/// Outcome of preparing one probe command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Substitution {
    Command(String),
    /// A declared source value is empty, failed, or was itself never captured.
    Unavailable { source: usize },
}

/// Split declared source indices into usable indices and rejected raw entries.
pub fn parse_source_indices(params: &[String]) -> (Vec<usize>, Vec<&str>) {
    let mut indices = Vec::new();
    let mut rejected = Vec::new();
    for param in params {
        match param.trim().parse::<usize>() {
            Ok(index) => indices.push(index),
            Err(_) => rejected.push(param.as_str()),
        }
    }
    (indices, rejected)
}

/// Replace `#x` tokens in `template` with values captured by earlier probes.
///
/// Sources beyond the captured range are ignored. A template without tokens
/// is returned unchanged.
pub fn substitute_params(
    template: &str,
    sources: &[usize],
    captured: &[CapturedValue],
) -> Substitution {
    let mut command = template.to_string();
    for &source in sources {
        let Some(value) = captured.get(source) else {
            continue;
        };
        let text = match value {
            CapturedValue::Output(text) if !text.trim().is_empty() => text,
            _ => return Substitution::Unavailable { source },
        };
        let text = strip_line_terminator(text);
        command = replace_token(&command, source, text);
    }
    Substitution::Command(command)
}

fn strip_line_terminator(text: &str) -> &str {
    match text.strip_suffix('\n') {
        Some(stripped) => stripped.strip_suffix('\r').unwrap_or(stripped),
        None => text,
    }
}

/// Replace `#index` occurrences that are not followed by another digit.
fn replace_token(template: &str, index: usize, value: &str) -> String {
    let token = format!("#{index}");
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find(&token) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + token.len()..];
        if after.starts_with(|ch: char| ch.is_ascii_digit()) {
            out.push_str(&token);
        } else {
            out.push_str(value);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Rule choosing the dummy value recorded for a probe that could not run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderPolicy {
    /// Not-a-number when the probe's placeholder appears unquoted in the
    /// assertion, not-a-string otherwise.
    #[default]
    ByQuoting,
    AlwaysString,
    AlwaysNumber,
}

impl PlaceholderPolicy {
    pub fn dummy_for(self, template: Option<&AssertionTemplate>, index: usize) -> CapturedValue {
        match self {
            PlaceholderPolicy::AlwaysString => CapturedValue::Unavailable,
            PlaceholderPolicy::AlwaysNumber => CapturedValue::MalformedNumber,
            PlaceholderPolicy::ByQuoting => match template {
                Some(template) if template.usage(index).bare => CapturedValue::MalformedNumber,
                _ => CapturedValue::Unavailable,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(text: &str) -> CapturedValue {
        CapturedValue::Output(text.to_string())
    }

    #[test]
    fn template_without_tokens_is_unchanged() {
        let captured = vec![output("kube-system\n")];
        assert_eq!(
            substitute_params("kubectl get ns", &[0], &captured),
            Substitution::Command("kubectl get ns".to_string())
        );
        assert_eq!(
            substitute_params("kubectl get ns", &[], &[]),
            Substitution::Command("kubectl get ns".to_string())
        );
    }

    #[test]
    fn replaces_every_token_and_strips_trailing_newline() {
        let captured = vec![output("/etc/kubernetes/admin.conf\n")];
        assert_eq!(
            substitute_params("stat -c %a #0 && stat -c %U #0", &[0], &captured),
            Substitution::Command(
                "stat -c %a /etc/kubernetes/admin.conf && stat -c %U /etc/kubernetes/admin.conf"
                    .to_string()
            )
        );
    }

    #[test]
    fn strips_only_one_terminator() {
        let captured = vec![output("a\nb\r\n")];
        assert_eq!(
            substitute_params("echo '#0'", &[0], &captured),
            Substitution::Command("echo 'a\nb'".to_string())
        );
    }

    #[test]
    fn does_not_replace_prefix_of_longer_token() {
        let captured = vec![output("x"), output("one")];
        assert_eq!(
            substitute_params("echo #1 #10", &[1], &captured),
            Substitution::Command("echo one #10".to_string())
        );
    }

    #[test]
    fn out_of_range_source_falls_through() {
        let captured = vec![output("value")];
        assert_eq!(
            substitute_params("echo #3", &[3], &captured),
            Substitution::Command("echo #3".to_string())
        );
    }

    #[test]
    fn missing_or_invalid_source_is_unavailable() {
        for value in [
            output(""),
            output("\n"),
            CapturedValue::Failed,
            CapturedValue::Unavailable,
            CapturedValue::MalformedNumber,
        ] {
            let captured = vec![value];
            assert_eq!(
                substitute_params("stat #0", &[0], &captured),
                Substitution::Unavailable { source: 0 }
            );
        }
    }

    #[test]
    fn parses_source_indices() {
        let params = vec!["0".to_string(), " 2 ".to_string(), "x".to_string()];
        let (indices, rejected) = parse_source_indices(&params);
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(rejected, vec!["x"]);
    }

    #[test]
    fn policy_picks_dummy_from_quoting() {
        let template = AssertionTemplate::parse("'$0' == 'a' && $1 > 2").unwrap();
        let policy = PlaceholderPolicy::ByQuoting;
        assert_eq!(
            policy.dummy_for(Some(&template), 0),
            CapturedValue::Unavailable
        );
        assert_eq!(
            policy.dummy_for(Some(&template), 1),
            CapturedValue::MalformedNumber
        );
        assert_eq!(policy.dummy_for(None, 1), CapturedValue::Unavailable);
        assert_eq!(
            PlaceholderPolicy::AlwaysNumber.dummy_for(Some(&template), 0),
            CapturedValue::MalformedNumber
        );
        assert_eq!(
            PlaceholderPolicy::AlwaysString.dummy_for(Some(&template), 1),
            CapturedValue::Unavailable
        );
    }
}
