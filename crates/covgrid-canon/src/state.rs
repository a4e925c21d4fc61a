//! Per-row option state.
//!
//! A [`LineState`] is created empty for each row and only ever changes by
//! folding operators (first pass) or by the re-interpretation transitions
//! (second pass). Options move between the active set and the latent list;
//! nothing removes an option id from the state.

use crate::block::Scope;
use crate::operator::{Operator, RestrictionKind};
use covgrid_kernel::Cap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Domain {
    #[default]
    Clinico,
    Financiero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LatentReason {
    HerenciaCortada,
    LimitanteTope,
    CambioDominio,
    Otra,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatentOption {
    pub option_id: String,
    pub reason: LatentReason,
    pub scope: Scope,
    pub source_block: String,
}

/// A restriction as recorded in the state, tagged with the domain that was
/// current when it was applied. Restrictions are never re-scoped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restriction {
    pub kind: RestrictionKind,
    pub cap: Cap,
    pub domain: Domain,
    pub source_block: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineState {
    pub active_options: BTreeSet<String>,
    pub latent_options: Vec<LatentOption>,
    pub restrictions: Vec<Restriction>,
    pub domain: Domain,
    pub inheritance_cut: bool,
}

/// Fold `operators` into `state`, left to right.
pub fn apply(state: LineState, operators: &[Operator]) -> LineState {
    operators.iter().fold(state, apply_one)
}

fn apply_one(mut state: LineState, operator: &Operator) -> LineState {
    match operator {
        Operator::HerenciaCortada { .. } => state.inheritance_cut = true,
        Operator::CambioDominioFinanciero { .. } => state.domain = Domain::Financiero,
        Operator::Restriction {
            kind,
            cap,
            source_block,
        } => state.restrictions.push(Restriction {
            kind: *kind,
            cap: cap.clone(),
            domain: state.domain,
            source_block: source_block.clone(),
        }),
    }
    state
}

impl LineState {
    /// A state whose active set is seeded with `option_ids`.
    pub fn seeded<I, S>(option_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active_options: option_ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Every option id the state knows, active or latent.
    pub fn option_ids(&self) -> BTreeSet<&str> {
        self.active_options
            .iter()
            .map(String::as_str)
            .chain(self.latent_options.iter().map(|l| l.option_id.as_str()))
            .collect()
    }

    pub fn is_active(&self, option_id: &str) -> bool {
        self.active_options.contains(option_id)
    }

    pub fn latent(&self, option_id: &str) -> Option<&LatentOption> {
        self.latent_options.iter().find(|l| l.option_id == option_id)
    }

    /// Move an active option to latent. No-op when it is not active.
    pub fn deactivate(
        &mut self,
        option_id: &str,
        reason: LatentReason,
        scope: Scope,
        source_block: &str,
    ) -> bool {
        if !self.active_options.remove(option_id) {
            return false;
        }
        self.latent_options.push(LatentOption {
            option_id: option_id.to_string(),
            reason,
            scope,
            source_block: source_block.to_string(),
        });
        true
    }

    /// Move a latent option back to active unless it was cut by inheritance.
    pub fn reactivate(&mut self, option_id: &str) -> bool {
        let Some(pos) = self
            .latent_options
            .iter()
            .position(|l| l.option_id == option_id)
        else {
            return false;
        };
        if self.latent_options[pos].reason == LatentReason::HerenciaCortada {
            return false;
        }
        let latent = self.latent_options.remove(pos);
        self.active_options.insert(latent.option_id);
        true
    }

    /// Make `option_id` latent for HERENCIA_CORTADA, whether it is currently
    /// active or latent for another reason.
    pub fn cut_inheritance(&mut self, option_id: &str, scope: Scope, source_block: &str) {
        if self.deactivate(option_id, LatentReason::HerenciaCortada, scope, source_block) {
            return;
        }
        if let Some(latent) = self
            .latent_options
            .iter_mut()
            .find(|l| l.option_id == option_id)
        {
            latent.reason = LatentReason::HerenciaCortada;
            latent.scope = scope;
            latent.source_block = source_block.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_sets_flags_and_accumulates_restrictions() {
        let ops = vec![
            Operator::Restriction {
                kind: RestrictionKind::TopeEvento,
                cap: Cap::amount("UF", 16.0),
                source_block: "B1".into(),
            },
            Operator::CambioDominioFinanciero {
                source_block: "B2".into(),
                term: "medicamentos".into(),
            },
            Operator::Restriction {
                kind: RestrictionKind::TopeAnualNfe,
                cap: Cap::NoCap,
                source_block: "B2".into(),
            },
            Operator::HerenciaCortada {
                source_block: "B3".into(),
            },
        ];
        let state = apply(LineState::default(), &ops);
        assert!(state.inheritance_cut);
        assert_eq!(state.domain, Domain::Financiero);
        assert_eq!(state.restrictions.len(), 2);
        assert_eq!(state.restrictions[0].domain, Domain::Clinico);
        assert_eq!(state.restrictions[1].domain, Domain::Financiero);
    }

    #[test]
    fn apply_is_a_left_fold() {
        let a = Operator::HerenciaCortada {
            source_block: "B1".into(),
        };
        let b = Operator::CambioDominioFinanciero {
            source_block: "B2".into(),
            term: "traslados".into(),
        };
        let once = apply(LineState::default(), &[a.clone(), b.clone()]);
        let stepwise = apply(apply(LineState::default(), &[a]), &[b]);
        assert_eq!(once, stepwise);
    }

    #[test]
    fn moves_conserve_option_ids() {
        let mut state = LineState::seeded(["o1", "o2"]);
        assert!(state.deactivate("o1", LatentReason::LimitanteTope, Scope::TopeEvento, "B1"));
        assert!(!state.deactivate("o1", LatentReason::LimitanteTope, Scope::TopeEvento, "B1"));
        assert_eq!(state.option_ids(), BTreeSet::from(["o1", "o2"]));
        assert!(state.reactivate("o1"));
        assert!(state.is_active("o1"));
        assert_eq!(state.option_ids().len(), 2);
    }

    #[test]
    fn inheritance_cut_is_sticky() {
        let mut state = LineState::seeded(["o1"]);
        state.deactivate("o1", LatentReason::LimitanteTope, Scope::TopeEvento, "B1");
        state.cut_inheritance("o1", Scope::FinancialDomain, "B2");
        let latent = state.latent("o1").unwrap();
        assert_eq!(latent.reason, LatentReason::HerenciaCortada);
        assert_eq!(latent.source_block, "B2");
        assert!(!state.reactivate("o1"));
        assert!(!state.is_active("o1"));
    }
}
