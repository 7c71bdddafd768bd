//! Cartesian product over per-probe output lines.
//!
//! Each probe may report several matching resources, one per line. The
//! assertion must hold for every pairing, so the engine walks the full
//! product. The walk is an odometer over per-probe cursors: the first probe
//! varies slowest and the last probe fastest, which is the order a
//! depth-first recursion over the probe list would produce.

use super::{Binding, CapturedValue};

/// Candidate bindings contributed by one captured probe value.
///
/// Empty lines are dropped when the output has more than one line so a
/// trailing newline does not add a phantom combination. At least one
/// candidate is always returned.
pub fn candidates(value: &CapturedValue) -> Vec<Binding<'_>> {
    match value {
        CapturedValue::Output(text) => {
            let lines: Vec<&str> = text
                .split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line))
                .collect();
            let total = lines.len();
            let mut kept: Vec<Binding<'_>> = lines
                .into_iter()
                .filter(|line| !(line.is_empty() && total > 1))
                .map(Binding::Line)
                .collect();
            if kept.is_empty() {
                kept.push(Binding::Line(""));
            }
            kept
        }
        CapturedValue::Failed => vec![Binding::Failed],
        CapturedValue::Unavailable => vec![Binding::NotAString],
        CapturedValue::MalformedNumber => vec![Binding::NotANumber],
    }
}

/// Iterator over complete combinations, one binding per probe.
#[derive(Debug)]
pub struct Combinations<'a> {
    candidates: Vec<Vec<Binding<'a>>>,
    cursor: Vec<usize>,
    exhausted: bool,
}

impl<'a> Combinations<'a> {
    pub fn new(values: &'a [CapturedValue]) -> Self {
        let per_probe: Vec<Vec<Binding<'a>>> = values.iter().map(candidates).collect();
        Self {
            cursor: vec![0; per_probe.len()],
            exhausted: per_probe.is_empty(),
            candidates: per_probe,
        }
    }

    /// Number of combinations the iterator yields in total.
    pub fn total(&self) -> usize {
        if self.candidates.is_empty() {
            return 0;
        }
        self.candidates
            .iter()
            .map(Vec::len)
            .fold(1usize, usize::saturating_mul)
    }

    fn advance(&mut self) {
        for slot in (0..self.cursor.len()).rev() {
            self.cursor[slot] += 1;
            if self.cursor[slot] < self.candidates[slot].len() {
                return;
            }
            self.cursor[slot] = 0;
        }
        self.exhausted = true;
    }
}

impl<'a> Iterator for Combinations<'a> {
    type Item = Vec<Binding<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let combination = self
            .cursor
            .iter()
            .zip(&self.candidates)
            .map(|(&index, lines)| lines[index])
            .collect();
        self.advance();
        Some(combination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(text: &str) -> CapturedValue {
        CapturedValue::Output(text.to_string())
    }

    fn lines(combination: &[Binding<'_>]) -> Vec<String> {
        combination
            .iter()
            .map(|binding| match binding {
                Binding::Line(line) => line.to_string(),
                Binding::Failed => "<failed>".to_string(),
                Binding::NotANumber => "<nan>".to_string(),
                Binding::NotAString => "<nas>".to_string(),
            })
            .collect()
    }

    #[test]
    fn trailing_newline_does_not_add_a_combination() {
        let values = vec![output("ns-a\nns-b\n")];
        let all: Vec<Vec<String>> = Combinations::new(&values).map(|c| lines(&c)).collect();
        assert_eq!(all, vec![vec!["ns-a"], vec!["ns-b"]]);
    }

    #[test]
    fn empty_output_contributes_one_empty_line() {
        assert_eq!(candidates(&output("")), vec![Binding::Line("")]);
        assert_eq!(candidates(&output("\n")), vec![Binding::Line("")]);
        assert_eq!(candidates(&output("\n\n")), vec![Binding::Line("")]);
    }

    #[test]
    fn sentinels_contribute_one_candidate() {
        assert_eq!(
            candidates(&CapturedValue::MalformedNumber),
            vec![Binding::NotANumber]
        );
        assert_eq!(
            candidates(&CapturedValue::Unavailable),
            vec![Binding::NotAString]
        );
        assert_eq!(candidates(&CapturedValue::Failed), vec![Binding::Failed]);
    }

    #[test]
    fn strips_carriage_returns() {
        assert_eq!(
            candidates(&output("a\r\nb\r\n")),
            vec![Binding::Line("a"), Binding::Line("b")]
        );
    }

    #[test]
    fn walks_product_with_last_probe_fastest() {
        let values = vec![output("1\n2\n"), output("x\ny\nz"), output("true\n")];
        let combinations = Combinations::new(&values);
        assert_eq!(combinations.total(), 6);
        let all: Vec<Vec<String>> = combinations.map(|c| lines(&c)).collect();
        assert_eq!(
            all,
            vec![
                vec!["1", "x", "true"],
                vec!["1", "y", "true"],
                vec!["1", "z", "true"],
                vec!["2", "x", "true"],
                vec!["2", "y", "true"],
                vec!["2", "z", "true"],
            ]
        );
    }

    #[test]
    fn every_combination_is_complete() {
        let values = vec![output("a\nb"), CapturedValue::MalformedNumber, output("")];
        let all: Vec<Vec<Binding<'_>>> = Combinations::new(&values).collect();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|combination| combination.len() == values.len()));
    }

    #[test]
    fn no_probes_yield_no_combinations() {
        let values: Vec<CapturedValue> = Vec::new();
        let combinations = Combinations::new(&values);
        assert_eq!(combinations.total(), 0);
        assert_eq!(combinations.count(), 0);
    }
}
