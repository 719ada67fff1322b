//! Duplicate contact detection.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::config::MergeConfig;
use crate::contact::{Contact, ContactSignature, fold_name};
use crate::error::{Result, UnifyError};
use crate::message::Message;

use super::decisions::DecisionLog;

/// Phone numbers with at least this many digits are compared on their last
/// this-many digits, so a number with and without country code match.
const PHONE_SUFFIX_DIGITS: usize = 10;

/// Why two contacts were linked.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchReason {
    SharedPhone(String),
    SharedEmail(String),
    SimilarName { left: String, right: String, score: f64 },
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchReason::SharedPhone(digits) => write!(f, "shared phone {digits}"),
            MatchReason::SharedEmail(email) => write!(f, "shared email {email}"),
            MatchReason::SimilarName { left, right, score } => {
                write!(f, "similar names \"{left}\" / \"{right}\" ({score:.2})")
            }
        }
    }
}

/// A set of raw contacts suspected to be one person.
#[derive(Debug, Clone)]
pub struct CandidateGroup {
    /// Position in the pending list; stable for the same corpus and log.
    pub index: usize,
    /// Members ordered by signature.
    pub contacts: Vec<Contact>,
    pub reasons: Vec<MatchReason>,
}

impl CandidateGroup {
    /// Sorted member signatures: the identity of this group in the decision log.
    pub fn signatures(&self) -> Vec<ContactSignature> {
        self.contacts.iter().map(Contact::signature).collect()
    }

    /// Longest member name, with every phone number and email of the group.
    pub fn suggested(&self) -> Contact {
        let named: Vec<&Contact> = self.contacts.iter().filter(|c| !c.is_address_only()).collect();
        let pool: Vec<&Contact> = if named.is_empty() {
            self.contacts.iter().collect()
        } else {
            named
        };
        let name = pool
            .into_iter()
            .map(Contact::name)
            .fold("", |best, name| {
                if name.chars().count() > best.chars().count() {
                    name
                } else {
                    best
                }
            });
        let mut target = Contact::new(name);
        for contact in &self.contacts {
            for phone in contact.phone_numbers() {
                target = target.with_phone(phone);
            }
            for email in contact.emails() {
                target = target.with_email(email);
            }
        }
        target
    }
}

/// Distinct contacts referenced by `messages`, ordered by signature.
pub fn collect_contacts(messages: &[Message]) -> Vec<Contact> {
    let unique: BTreeMap<ContactSignature, &Contact> = messages
        .iter()
        .flat_map(|m| [m.from(), m.to()])
        .map(|c| (c.signature(), c))
        .collect();
    unique.into_values().cloned().collect()
}

fn phone_key(digits: &str) -> &str {
    if digits.len() >= PHONE_SUFFIX_DIGITS {
        &digits[digits.len() - PHONE_SUFFIX_DIGITS..]
    } else {
        digits
    }
}

fn is_prefix_pair(a: &str, b: &str) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// Scores two display names, returning `Some(score)` if they look like the
/// same person.
///
/// Names match when, token by token, one is a prefix of the other
/// ("John Smith" / "Johnny Smith"), or when the whole names are close by
/// Jaro-Winkler and no aligned token pair contradicts ("John" / "Jane").
/// Names shorter than `min_name_len` never match.
pub fn name_similarity(a: &str, b: &str, config: &MergeConfig) -> Option<f64> {
    let (a, b) = (fold_name(a), fold_name(b));
    if a.chars().count() < config.min_name_len || b.chars().count() < config.min_name_len {
        return None;
    }
    if a == b {
        return Some(1.0);
    }

    let score = strsim::jaro_winkler(&a, &b);
    let left: Vec<&str> = a.split(' ').collect();
    let right: Vec<&str> = b.split(' ').collect();
    if left.len() == right.len() {
        if left.iter().zip(&right).all(|(l, r)| is_prefix_pair(l, r)) {
            return Some(score.max(config.name_similarity));
        }
        let conflict = left
            .iter()
            .zip(&right)
            .any(|(l, r)| !is_prefix_pair(l, r) && strsim::jaro_winkler(l, r) < config.name_similarity);
        if conflict {
            return None;
        }
    }
    (score >= config.name_similarity).then_some(score)
}

/// Union-find over contact indices.
struct Groups {
    parent: Vec<usize>,
}

impl Groups {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

/// Finds candidate groups among `contacts`, ignoring groups the log has
/// already settled.
///
/// A group is settled when a skip decision names exactly its signatures, or
/// when accepted decisions already map every member to one canonical contact.
pub fn find_candidates(
    contacts: &[Contact],
    config: &MergeConfig,
    log: &DecisionLog,
) -> Vec<CandidateGroup> {
    let mut groups = Groups::new(contacts.len());
    let mut links: Vec<(usize, usize, MatchReason)> = Vec::new();

    let mut by_phone: HashMap<String, usize> = HashMap::new();
    let mut by_email: HashMap<&str, usize> = HashMap::new();
    for (i, contact) in contacts.iter().enumerate() {
        for digits in contact.phone_digits() {
            let key = phone_key(&digits).to_string();
            match by_phone.get(&key) {
                Some(&j) => links.push((j, i, MatchReason::SharedPhone(key))),
                None => {
                    by_phone.insert(key, i);
                }
            }
        }
        if config.match_emails {
            for email in contact.emails() {
                match by_email.get(email.as_str()) {
                    Some(&j) => links.push((j, i, MatchReason::SharedEmail(email.clone()))),
                    None => {
                        by_email.insert(email.as_str(), i);
                    }
                }
            }
        }
    }

    for i in 0..contacts.len() {
        if contacts[i].is_address_only() {
            continue;
        }
        for j in i + 1..contacts.len() {
            if contacts[j].is_address_only() {
                continue;
            }
            if let Some(score) = name_similarity(contacts[i].name(), contacts[j].name(), config) {
                links.push((
                    i,
                    j,
                    MatchReason::SimilarName {
                        left: contacts[i].name().to_string(),
                        right: contacts[j].name().to_string(),
                        score,
                    },
                ));
            }
        }
    }

    for (a, b, _) in &links {
        groups.union(*a, *b);
    }

    let mut members: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
    for i in 0..contacts.len() {
        let root = groups.find(i);
        members.entry(root).or_default().insert(i);
    }

    let mut reasons: HashMap<usize, Vec<MatchReason>> = HashMap::new();
    for (a, _, reason) in links {
        let root = groups.find(a);
        let entry = reasons.entry(root).or_default();
        if !entry.contains(&reason) {
            entry.push(reason);
        }
    }

    let plan = log.plan();
    let mut pending: Vec<CandidateGroup> = members
        .into_iter()
        .filter(|(_, set)| set.len() > 1)
        .map(|(root, set)| {
            let mut group: Vec<Contact> = set.into_iter().map(|i| contacts[i].clone()).collect();
            group.sort_by_key(Contact::signature);
            CandidateGroup {
                index: 0,
                contacts: group,
                reasons: reasons.remove(&root).unwrap_or_default(),
            }
        })
        .filter(|group| {
            let signatures = group.signatures();
            !log.is_skipped(&signatures) && !plan.settles(&group.contacts)
        })
        .collect();

    pending.sort_by_key(CandidateGroup::signatures);
    for (index, group) in pending.iter_mut().enumerate() {
        group.index = index;
    }
    pending
}

/// Looks up a pending group by the index shown to the operator.
pub fn candidate(groups: &[CandidateGroup], index: usize) -> Result<&CandidateGroup> {
    groups.get(index).ok_or(UnifyError::UnknownCandidate {
        index,
        available: groups.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::decisions::MergeDecision;

    fn config() -> MergeConfig {
        MergeConfig::default()
    }

    #[test]
    fn test_name_similarity_prefix_tokens() {
        assert!(name_similarity("John", "Johnny", &config()).is_some());
        assert!(name_similarity("John Smith", "johnny  smith", &config()).is_some());
        assert!(name_similarity("John", "Jane", &config()).is_none());
        assert!(name_similarity("Jane Smith", "John Smith", &config()).is_none());
    }

    #[test]
    fn test_name_similarity_short_names() {
        assert!(name_similarity("Al", "Al", &config()).is_none());
        assert_eq!(name_similarity("Ann", "ann", &config()), Some(1.0));
    }

    #[test]
    fn test_name_similarity_typo() {
        let score = name_similarity("Katherine", "Katharine", &config()).unwrap();
        assert!(score >= 0.92);
    }

    #[test]
    fn test_shared_phone_with_country_code() {
        let contacts = vec![
            Contact::new("Bob").with_phone("+1 555 123 4567"),
            Contact::from_address("(555) 123-4567"),
            Contact::new("Carol").with_phone("+15550000000"),
        ];
        let groups = find_candidates(&contacts, &config(), &DecisionLog::new());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].contacts.len(), 2);
        assert!(matches!(groups[0].reasons[0], MatchReason::SharedPhone(_)));
        assert_eq!(groups[0].suggested().name(), "Bob");
    }

    #[test]
    fn test_shared_email_toggle() {
        let contacts = vec![
            Contact::new("Ann Lee").with_email("ann@x.com"),
            Contact::new("A. Lee").with_email("ANN@x.com"),
        ];
        assert_eq!(find_candidates(&contacts, &config(), &DecisionLog::new()).len(), 1);

        let no_email = config().with_match_emails(false);
        assert!(find_candidates(&contacts, &no_email, &DecisionLog::new()).is_empty());
    }

    #[test]
    fn test_suggested_unions_addresses() {
        let contacts = vec![
            Contact::new("Jon").with_phone("+15551234567"),
            Contact::new("Jonathan").with_email("jon@x.com"),
        ];
        let groups = find_candidates(&contacts, &config(), &DecisionLog::new());
        let target = groups[0].suggested();
        assert_eq!(target.name(), "Jonathan");
        assert!(target.has_email("jon@x.com"));
        assert!(target.phone_numbers().contains("+15551234567"));
    }

    #[test]
    fn test_skip_is_not_resurfaced() {
        let contacts = vec![Contact::new("John"), Contact::new("Johnny")];
        let mut log = DecisionLog::new();
        let groups = find_candidates(&contacts, &config(), &log);
        assert_eq!(groups.len(), 1);

        log.record(MergeDecision::skip(groups[0].signatures(), "different people"))
            .unwrap();
        assert!(find_candidates(&contacts, &config(), &log).is_empty());

        // A new member changes the set, so the group is asked about again
        let mut grown = contacts.clone();
        grown.push(Contact::new("Johnn"));
        assert_eq!(find_candidates(&grown, &config(), &log).len(), 1);
    }

    #[test]
    fn test_accepted_merge_is_settled() {
        let contacts = vec![Contact::new("John"), Contact::new("Johnny")];
        let mut log = DecisionLog::new();
        let groups = find_candidates(&contacts, &config(), &log);
        log.record(MergeDecision::merge(groups[0].signatures(), &groups[0].suggested(), ""))
            .unwrap();
        assert!(find_candidates(&contacts, &config(), &log).is_empty());
    }

    #[test]
    fn test_candidate_lookup() {
        let err = candidate(&[], 3).unwrap_err();
        assert!(matches!(
            err,
            UnifyError::UnknownCandidate {
                index: 3,
                available: 0
            }
        ));
    }

    #[test]
    fn test_collect_contacts_dedups() {
        use chrono::{TimeZone, Utc};
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let me = Contact::new("Me");
        let bob = Contact::new("Bob");
        let messages = vec![
            Message::new("t", me.clone(), bob.clone(), ts),
            Message::new("t", bob.clone(), me.clone(), ts),
            Message::new("t", Contact::new("bob"), me, ts),
        ];
        assert_eq!(collect_contacts(&messages).len(), 2);
    }
}
