//! Text dump of an ATN for inspection and snapshot testing.

use std::fmt::Write;

use crate::atn::{Atn, AtnStateKind, NO_RULE, Transition};

/// Printer for [`Atn`] with an optional per-rule filter.
pub struct AtnPrinter<'a> {
    atn: &'a Atn,
    rule_filter: Option<u32>,
}

impl<'a> AtnPrinter<'a> {
    pub fn new(atn: &'a Atn) -> Self {
        Self {
            atn,
            rule_filter: None,
        }
    }

    /// Restrict the state listing to one rule.
    pub fn rule(mut self, rule: u32) -> Self {
        self.rule_filter = Some(rule);
        self
    }

    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    fn format(&self, w: &mut String) -> std::fmt::Result {
        for rule in &self.atn.rules {
            if self.rule_filter.is_some_and(|f| f != rule.id) {
                continue;
            }
            write!(w, "rule {}: start={} stop={}", rule.name, rule.start, rule.stop)?;
            if let Some(t) = rule.token_type {
                write!(w, " type={t}")?;
            }
            if rule.is_implicit {
                write!(w, " (implicit)")?;
            }
            writeln!(w)?;
        }

        for state in &self.atn.states {
            if self
                .rule_filter
                .is_some_and(|f| state.rule != f || state.rule == NO_RULE)
            {
                continue;
            }
            write!(w, "s{} {}", state.id, kind_name(state.kind))?;
            if let Some(d) = state.decision {
                write!(w, " d{d}")?;
            }
            if !state.transitions.is_empty() {
                write!(w, ":")?;
                for transition in &state.transitions {
                    write!(w, " {}", self.format_transition(transition))?;
                }
            }
            writeln!(w)?;
        }

        for decision in &self.atn.decisions {
            if self.rule_filter.is_some_and(|f| f != decision.rule) {
                continue;
            }
            writeln!(
                w,
                "decision {}: state=s{} rule={} alts={}",
                decision.id,
                decision.state,
                self.rule_name(decision.rule),
                self.atn.alternative_count(decision.id)
            )?;
        }
        Ok(())
    }

    fn format_transition(&self, transition: &Transition) -> String {
        match transition {
            Transition::Epsilon { target } => format!("ε→{target}"),
            Transition::Atom { label, target } => format!("atom({label})→{target}"),
            Transition::Range { from, to, target } => format!("range({from},{to})→{target}"),
            Transition::Set { set, target } => format!("set{set}→{target}"),
            Transition::NotSet { set, target } => format!("not{set}→{target}"),
            Transition::Wildcard { target } => format!("any→{target}"),
            Transition::Rule {
                rule,
                target,
                follow,
                precedence,
            } => format!(
                "rule({},p{precedence})→{target} follow={follow}",
                self.rule_name(*rule)
            ),
            Transition::Predicate {
                pred_index, target, ..
            } => format!("pred({pred_index})→{target}"),
            Transition::Action {
                action_index,
                target,
                ..
            } => format!("act({action_index})→{target}"),
            Transition::Precedence { level, target } => format!("prec({level})→{target}"),
        }
    }

    fn rule_name(&self, rule: u32) -> &str {
        if rule == NO_RULE {
            return "<none>";
        }
        &self.atn.rules[rule as usize].name
    }
}

fn kind_name(kind: AtnStateKind) -> &'static str {
    match kind {
        AtnStateKind::Basic => "Basic",
        AtnStateKind::RuleStart => "RuleStart",
        AtnStateKind::RuleStop => "RuleStop",
        AtnStateKind::BlockStart => "BlockStart",
        AtnStateKind::BlockEnd => "BlockEnd",
        AtnStateKind::PlusBlockStart => "PlusBlockStart",
        AtnStateKind::PlusLoopBack => "PlusLoopBack",
        AtnStateKind::StarBlockStart => "StarBlockStart",
        AtnStateKind::StarLoopBack => "StarLoopBack",
        AtnStateKind::StarLoopEntry => "StarLoopEntry",
        AtnStateKind::LoopEnd => "LoopEnd",
        AtnStateKind::TokenStart => "TokenStart",
    }
}
