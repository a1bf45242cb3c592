//! Prefix-based classification of typed keys against the action catalog

use crate::keymap::{Key, KeySequence, Mode};

use super::action::{Action, ExecutionStrategy, PatternKind};
use super::catalog::vim_patterns;
use super::pattern::{is_register_name, ActionPattern, PatternToken};

/// Values captured by wildcard tokens during a match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    /// `<count-digit>`
    pub digit: Option<u32>,
    /// `<any-character>`
    pub character: Option<Key>,
    /// `<register-name>`
    pub register: Option<char>,
    /// `<range>`
    pub range: Option<Box<RangeCapture>>,
}

/// The motion or text object an operator applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeCapture {
    /// Count typed inside the range (`d3w`), 0 when absent
    pub count: usize,
    pub action: Action,
    pub kind: PatternKind,
    pub captures: Captures,
}

/// A complete match of a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMatch {
    pub action: Action,
    pub kind: PatternKind,
    pub strategy: ExecutionStrategy,
    pub enters: Option<Mode>,
    pub captures: Captures,
    /// The keys that produced this match
    pub keys: KeySequence,
}

/// Result of classifying the keys of the action being typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Exactly one reading, nothing longer possible
    Complete(ActionMatch),
    /// A complete match, but a longer pattern could still match
    Ambiguous(ActionMatch),
    /// The keys are a strict prefix of some pattern
    Potential,
    NoMatch,
}

/// Progress of one pattern against the input
enum Progress {
    Complete(Captures),
    Partial,
    Fail,
}

/// Classifies key sequences against a fixed list of patterns
#[derive(Debug, Clone)]
pub struct ActionMatcher {
    patterns: Vec<ActionPattern>,
}

impl Default for ActionMatcher {
    fn default() -> Self {
        Self::vim()
    }
}

impl ActionMatcher {
    pub fn new(patterns: Vec<ActionPattern>) -> Self {
        Self { patterns }
    }

    /// Matcher over the default Vim catalog
    pub fn vim() -> Self {
        Self::new(vim_patterns())
    }

    pub fn patterns(&self) -> &[ActionPattern] {
        &self.patterns
    }

    /// Classify `keys` typed in `mode`, given the count accumulated so far
    pub fn classify(&self, mode: Mode, keys: &[Key], count: usize) -> Classification {
        if keys.is_empty() {
            return Classification::NoMatch;
        }

        let mut complete = None;
        let mut potential = false;

        for pattern in self.patterns.iter().filter(|p| p.applies_in(mode)) {
            match self.match_tokens(&pattern.keys, keys, count, Captures::default()) {
                Progress::Complete(captures) => {
                    if complete.is_none() {
                        complete = Some(ActionMatch {
                            action: pattern.action,
                            kind: pattern.kind,
                            strategy: pattern.strategy,
                            enters: pattern.enters,
                            captures,
                            keys: keys.to_vec(),
                        });
                    }
                }
                Progress::Partial => potential = true,
                Progress::Fail => {}
            }
        }

        match (complete, potential) {
            (Some(m), false) => Classification::Complete(m),
            (Some(m), true) => Classification::Ambiguous(m),
            (None, true) => Classification::Potential,
            (None, false) => Classification::NoMatch,
        }
    }

    /// Whether `keys` are exactly an operator still waiting for its range
    pub fn operator_prefix(&self, mode: Mode, keys: &[Key]) -> bool {
        if keys.is_empty() {
            return false;
        }
        self.patterns
            .iter()
            .filter(|p| p.applies_in(mode))
            .filter_map(|p| p.range_start().map(|start| &p.keys[..start]))
            .any(|head| {
                head.len() == keys.len()
                    && head
                        .iter()
                        .zip(keys)
                        .all(|(token, key)| *token == PatternToken::Key(*key))
            })
    }

    fn match_tokens(
        &self,
        tokens: &[PatternToken],
        input: &[Key],
        count: usize,
        mut captures: Captures,
    ) -> Progress {
        let Some((token, rest_tokens)) = tokens.split_first() else {
            return if input.is_empty() {
                Progress::Complete(captures)
            } else {
                Progress::Fail
            };
        };
        let Some((key, rest_input)) = input.split_first() else {
            return Progress::Partial;
        };

        match token {
            PatternToken::Key(expected) => {
                if expected != key {
                    return Progress::Fail;
                }
            }
            PatternToken::CountDigit => match key.digit() {
                Some(0) if count == 0 => return Progress::Fail,
                Some(d) => captures.digit = Some(d),
                None => return Progress::Fail,
            },
            PatternToken::AnyCharacter => {
                if !key.is_character() {
                    return Progress::Fail;
                }
                captures.character = Some(*key);
            }
            PatternToken::RegisterName => match key.as_char() {
                Some(c) if is_register_name(key) => captures.register = Some(c),
                _ => return Progress::Fail,
            },
            PatternToken::Range => return self.match_range(rest_tokens, input, count, captures),
        }

        self.match_tokens(rest_tokens, rest_input, count, captures)
    }

    /// Try every split of `input` into a range and whatever follows it
    fn match_range(
        &self,
        rest_tokens: &[PatternToken],
        input: &[Key],
        count: usize,
        captures: Captures,
    ) -> Progress {
        let mut partial = false;

        for split in 1..=input.len() {
            let (range_keys, after) = input.split_at(split);
            match self.match_range_keys(range_keys) {
                Progress::Complete(range) => {
                    let mut captures = captures.clone();
                    captures.range = range.range;
                    match self.match_tokens(rest_tokens, after, count, captures) {
                        Progress::Complete(c) => return Progress::Complete(c),
                        Progress::Partial => partial = true,
                        Progress::Fail => {}
                    }
                }
                Progress::Partial if after.is_empty() => partial = true,
                Progress::Partial | Progress::Fail => {}
            }
        }

        if partial {
            Progress::Partial
        } else {
            Progress::Fail
        }
    }

    /// Match a whole range: `[1-9][0-9]*` then a motion or text object
    fn match_range_keys(&self, keys: &[Key]) -> Progress {
        let digits = keys
            .iter()
            .enumerate()
            .take_while(|(i, k)| matches!(k.digit(), Some(d) if d > 0 || *i > 0))
            .count();
        let count = keys[..digits]
            .iter()
            .filter_map(Key::digit)
            .fold(0usize, |acc, d| acc.saturating_mul(10).saturating_add(d as usize));
        let target_keys = &keys[digits..];
        if target_keys.is_empty() {
            return Progress::Partial;
        }

        let mut partial = false;
        let targets = self
            .patterns
            .iter()
            .filter(|p| p.kind.is_range_target() && p.applies_in(Mode::OperatorPending));
        for pattern in targets {
            match self.match_tokens(&pattern.keys, target_keys, 0, Captures::default()) {
                Progress::Complete(captures) => {
                    return Progress::Complete(Captures {
                        range: Some(Box::new(RangeCapture {
                            count,
                            action: pattern.action,
                            kind: pattern.kind,
                            captures,
                        })),
                        ..Captures::default()
                    });
                }
                Progress::Partial => partial = true,
                Progress::Fail => {}
            }
        }

        if partial {
            Progress::Partial
        } else {
            Progress::Fail
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::KeyCode;

    fn classify(mode: Mode, keys: &str) -> Classification {
        ActionMatcher::vim().classify(mode, &Key::chars(keys), 0)
    }

    fn complete_action(c: Classification) -> Action {
        match c {
            Classification::Complete(m) => m.action,
            other => panic!("expected complete match, got {:?}", other),
        }
    }

    // ========================================================================
    // Literal patterns
    // ========================================================================

    #[test]
    fn test_single_key_motion() {
        assert_eq!(complete_action(classify(Mode::Normal, "j")), Action::MoveDown);
    }

    #[test]
    fn test_multi_key_prefix_is_potential() {
        assert_eq!(classify(Mode::Normal, "g"), Classification::Potential);
        assert_eq!(
            complete_action(classify(Mode::Normal, "gg")),
            Action::DocumentStart
        );
    }

    #[test]
    fn test_unknown_keys_do_not_match() {
        assert_eq!(classify(Mode::Normal, "Z"), Classification::NoMatch);
        assert_eq!(classify(Mode::Normal, "gq"), Classification::NoMatch);
    }

    #[test]
    fn test_mode_filters_patterns() {
        assert_eq!(
            complete_action(classify(Mode::Visual, "d")),
            Action::DeleteSelection
        );
        assert_eq!(classify(Mode::Normal, "d"), Classification::Potential);
    }

    // ========================================================================
    // Wildcards
    // ========================================================================

    #[test]
    fn test_count_digit_zero_needs_count() {
        let matcher = ActionMatcher::vim();
        let zero = [Key::char('0')];
        match matcher.classify(Mode::Normal, &zero, 0) {
            Classification::Complete(m) => assert_eq!(m.action, Action::LineStart),
            other => panic!("unexpected {:?}", other),
        }
        match matcher.classify(Mode::Normal, &zero, 3) {
            Classification::Complete(m) => {
                assert_eq!(m.action, Action::Count);
                assert_eq!(m.captures.digit, Some(0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_any_character_capture() {
        match classify(Mode::Normal, "fx") {
            Classification::Complete(m) => {
                assert_eq!(m.action, Action::FindCharForward);
                assert_eq!(m.captures.character, Some(Key::char('x')));
            }
            other => panic!("unexpected {:?}", other),
        }
        let ctrl = [Key::char('f'), Key::ctrl('x')];
        assert_eq!(
            ActionMatcher::vim().classify(Mode::Normal, &ctrl, 0),
            Classification::NoMatch
        );
    }

    #[test]
    fn test_register_selection() {
        assert_eq!(classify(Mode::Normal, "\""), Classification::Potential);
        match classify(Mode::Normal, "\"a") {
            Classification::Complete(m) => {
                assert_eq!(m.action, Action::SelectRegister);
                assert_eq!(m.captures.register, Some('a'));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_insert_mode_typing() {
        assert_eq!(complete_action(classify(Mode::Insert, "q")), Action::InsertChar);
        let esc = [Key::ESCAPE];
        match ActionMatcher::vim().classify(Mode::Insert, &esc, 0) {
            Classification::Complete(m) => {
                assert_eq!(m.action, Action::Escape);
                assert_eq!(m.enters, Some(Mode::Normal));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_enter_executes_command_line() {
        let enter = [Key::key(KeyCode::Enter)];
        match ActionMatcher::vim().classify(Mode::CommandLine, &enter, 0) {
            Classification::Complete(m) => assert_eq!(m.action, Action::CommandLineExecute),
            other => panic!("unexpected {:?}", other),
        }
    }

    // ========================================================================
    // Ranges
    // ========================================================================

    #[test]
    fn test_operator_with_motion() {
        match classify(Mode::Normal, "dw") {
            Classification::Complete(m) => {
                assert_eq!(m.action, Action::Delete);
                let range = m.captures.range.expect("range");
                assert_eq!(range.action, Action::WordForward);
                assert_eq!(range.count, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_operator_with_counted_motion() {
        assert_eq!(classify(Mode::Normal, "d3"), Classification::Potential);
        assert_eq!(classify(Mode::Normal, "d12"), Classification::Potential);
        match classify(Mode::Normal, "d12j") {
            Classification::Complete(m) => {
                let range = m.captures.range.expect("range");
                assert_eq!(range.count, 12);
                assert_eq!(range.action, Action::MoveDown);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_operator_with_text_object_and_char_motion() {
        match classify(Mode::Normal, "ci(") {
            Classification::Complete(m) => {
                assert_eq!(m.action, Action::Change);
                assert_eq!(m.enters, Some(Mode::Insert));
                let range = m.captures.range.expect("range");
                assert_eq!(range.action, Action::InnerPair);
                assert_eq!(range.captures.character, Some(Key::char('(')));
            }
            other => panic!("unexpected {:?}", other),
        }
        match classify(Mode::Normal, "yt,") {
            Classification::Complete(m) => {
                let range = m.captures.range.expect("range");
                assert_eq!(range.action, Action::TillCharForward);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(classify(Mode::Normal, "dg"), Classification::Potential);
        assert_eq!(classify(Mode::Normal, "dq"), Classification::NoMatch);
    }

    #[test]
    fn test_doubled_operator() {
        assert_eq!(complete_action(classify(Mode::Normal, "dd")), Action::DeleteLine);
    }

    #[test]
    fn test_operator_prefix() {
        let matcher = ActionMatcher::vim();
        assert!(matcher.operator_prefix(Mode::Normal, &Key::chars("d")));
        assert!(matcher.operator_prefix(Mode::Normal, &Key::chars("y")));
        assert!(!matcher.operator_prefix(Mode::Normal, &Key::chars("dw")));
        assert!(!matcher.operator_prefix(Mode::Normal, &Key::chars("g")));
        assert!(!matcher.operator_prefix(Mode::Visual, &Key::chars("d")));
    }

    // ========================================================================
    // Ambiguity
    // ========================================================================

    #[test]
    fn test_complete_with_longer_candidate_is_ambiguous() {
        let matcher = ActionMatcher::new(vec![
            ActionPattern::new("g", Action::DocumentEnd),
            ActionPattern::new("gg", Action::DocumentStart),
        ]);
        match matcher.classify(Mode::Normal, &Key::chars("g"), 0) {
            Classification::Ambiguous(m) => assert_eq!(m.action, Action::DocumentEnd),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            matcher.classify(Mode::Normal, &Key::chars("gg"), 0),
            Classification::Complete(ActionMatch {
                action: Action::DocumentStart,
                kind: PatternKind::Command,
                strategy: ExecutionStrategy::PerCursor,
                enters: None,
                captures: Captures::default(),
                keys: Key::chars("gg"),
            })
        );
    }

    #[test]
    fn test_default_catalog_has_no_ambiguity_for_single_keys() {
        let matcher = ActionMatcher::vim();
        for c in "hjklwbe0$xpPuiaoOIAvV:".chars() {
            let result = matcher.classify(Mode::Normal, &[Key::char(c)], 0);
            assert!(
                matches!(result, Classification::Complete(_)),
                "{} gave {:?}",
                c,
                result
            );
        }
    }
}
