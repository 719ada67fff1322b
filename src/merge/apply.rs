//! Rewriting messages with merged contacts.
//!
//! Accepted decisions chain: if one decision merges A and B into T, and a
//! later one merges T and C into U, all of A, B, T and C end up as U. Every
//! connected set of decisions resolves to the target of its most recent
//! decision. That target is never remapped, so applying a plan to its own
//! output changes nothing.

use std::collections::{BTreeMap, HashMap};

use tracing::info;

use crate::contact::{Contact, ContactSignature};
use crate::message::Message;

use super::decisions::MergeDecision;

/// Resolved mapping from raw identities to canonical contacts.
#[derive(Debug, Clone, Default)]
pub struct MergePlan {
    /// Canonical contact for every signature a decision touches, including
    /// the canonical signatures themselves.
    canonical: HashMap<ContactSignature, Contact>,
}

impl MergePlan {
    /// Builds a plan from accepted decisions, given in log order.
    pub fn from_decisions<'a>(decisions: impl IntoIterator<Item = &'a MergeDecision>) -> Self {
        let decisions: Vec<&MergeDecision> =
            decisions.into_iter().filter(|d| !d.is_skipped).collect();

        let mut ids: BTreeMap<ContactSignature, usize> = BTreeMap::new();
        let mut parent: Vec<usize> = Vec::new();
        let mut node = |sig: ContactSignature, parent: &mut Vec<usize>| -> usize {
            *ids.entry(sig).or_insert_with(|| {
                parent.push(parent.len());
                parent.len() - 1
            })
        };

        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        let mut targets: Vec<(usize, Contact)> = Vec::with_capacity(decisions.len());
        for decision in &decisions {
            let target = decision.target();
            let anchor = node(target.signature(), &mut parent);
            for sig in &decision.source_signatures {
                let other = node(sig.clone(), &mut parent);
                let (ra, rb) = (find(&mut parent, anchor), find(&mut parent, other));
                if ra != rb {
                    parent[rb] = ra;
                }
            }
            targets.push((anchor, target));
        }

        // Latest decision per component wins; ties on time keep log order.
        let mut order: Vec<usize> = (0..decisions.len()).collect();
        order.sort_by_key(|&i| decisions[i].decided_at);
        let mut winner: HashMap<usize, Contact> = HashMap::new();
        for i in order {
            let (anchor, target) = &targets[i];
            let root = find(&mut parent, *anchor);
            winner.insert(root, target.clone());
        }

        let mut canonical = HashMap::with_capacity(ids.len());
        for (sig, id) in ids {
            let root = find(&mut parent, id);
            if let Some(target) = winner.get(&root) {
                canonical.insert(sig, target.clone());
            }
        }
        Self { canonical }
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Canonical contact for `contact`, or `None` if no decision covers it
    /// or it already is canonical.
    pub fn resolve(&self, contact: &Contact) -> Option<&Contact> {
        self.canonical
            .get(&contact.signature())
            .filter(|target| *target != contact)
    }

    /// Returns `true` if every contact in `contacts` already resolves to the
    /// same canonical contact.
    pub fn settles(&self, contacts: &[Contact]) -> bool {
        let mut targets = contacts
            .iter()
            .map(|c| self.canonical.get(&c.signature()).map(Contact::signature));
        match targets.next() {
            Some(Some(first)) => targets.all(|t| t.as_ref() == Some(&first)),
            _ => false,
        }
    }

    fn rewrite(&self, message: Message) -> (Message, bool) {
        let from = self.resolve(message.from()).cloned();
        let to = self.resolve(message.to()).cloned();
        let changed = from.is_some() || to.is_some();
        let message = match from {
            Some(c) => message.with_from(c),
            None => message,
        };
        let message = match to {
            Some(c) => message.with_to(c),
            None => message,
        };
        (message, changed)
    }
}

/// Replaces every superseded `from`/`to` contact with its canonical contact.
/// All other message fields are kept.
pub fn apply_merges(messages: Vec<Message>, plan: &MergePlan) -> Vec<Message> {
    if plan.is_empty() {
        return messages;
    }
    let mut rewritten = 0;
    let out: Vec<Message> = messages
        .into_iter()
        .map(|m| {
            let (m, changed) = plan.rewrite(m);
            rewritten += usize::from(changed);
            m
        })
        .collect();
    info!(rewritten, "applied merge decisions");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sig(name: &str) -> ContactSignature {
        Contact::new(name).signature()
    }

    fn at(secs: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
    }

    fn message(from: &str, to: &str) -> Message {
        Message::new("test", Contact::new(from), Contact::new(to), at(0)).with_body("hi")
    }

    #[test]
    fn test_apply_rewrites_both_slots() {
        let target = Contact::new("Johnny").with_phone("+15551234567");
        let decisions = [MergeDecision::merge(vec![sig("John"), sig("Johnny")], &target, "")];
        let plan = MergePlan::from_decisions(&decisions);

        let out = apply_merges(vec![message("John", "Me"), message("Me", "Johnny")], &plan);
        assert_eq!(out[0].from(), &target);
        assert_eq!(out[1].to(), &target);
        assert_eq!(out[0].to().name(), "Me");
        assert_eq!(out[0].body(), "hi");
    }

    #[test]
    fn test_apply_is_idempotent() {
        let target = Contact::new("Johnny");
        let decisions = [MergeDecision::merge(vec![sig("John"), sig("Jon")], &target, "")];
        let plan = MergePlan::from_decisions(&decisions);

        let corpus = vec![message("John", "Me"), message("Jon", "Me"), message("Me", "Johnny")];
        let once = apply_merges(corpus, &plan);
        let twice = apply_merges(once.clone(), &plan);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_chained_decisions_are_transitive() {
        let t = Contact::new("T");
        let u = Contact::new("U");
        let decisions = [
            MergeDecision::merge(vec![sig("A"), sig("B")], &t, "").with_decided_at(at(1)),
            MergeDecision::merge(vec![sig("T"), sig("C")], &u, "").with_decided_at(at(2)),
        ];
        let plan = MergePlan::from_decisions(&decisions);
        for name in ["A", "B", "T", "C"] {
            assert_eq!(plan.resolve(&Contact::new(name)), Some(&u), "{name}");
        }
        assert_eq!(plan.resolve(&u), None);
        assert!(plan.settles(&[Contact::new("A"), Contact::new("C"), u.clone()]));
    }

    #[test]
    fn test_latest_decision_wins_shared_source() {
        let decisions = [
            MergeDecision::merge(vec![sig("A"), sig("B")], &Contact::new("Old"), "")
                .with_decided_at(at(1)),
            MergeDecision::merge(vec![sig("B"), sig("C")], &Contact::new("New"), "")
                .with_decided_at(at(5)),
        ];
        let plan = MergePlan::from_decisions(&decisions);
        assert_eq!(plan.resolve(&Contact::new("A")).unwrap().name(), "New");
        assert_eq!(plan.resolve(&Contact::new("Old")).unwrap().name(), "New");
    }

    #[test]
    fn test_skipped_decisions_are_ignored() {
        let decisions = [MergeDecision::skip(vec![sig("A"), sig("B")], "")];
        let plan = MergePlan::from_decisions(&decisions);
        assert!(plan.is_empty());
        assert!(!plan.settles(&[Contact::new("A"), Contact::new("B")]));
    }
}
