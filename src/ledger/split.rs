//! Split calculator - divide an expense total among its participants

use crate::money::{self, EPSILON};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

/// Opaque member identifier within a group
pub type ParticipantId = String;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("invalid split type: {0}")]
    UnknownPolicy(String),
    #[error("split has no participants")]
    NoParticipants,
    #[error("total share weight is zero")]
    ZeroTotalWeight,
    #[error("duplicate participant: {0}")]
    DuplicateParticipant(ParticipantId),
    #[error("missing {policy} value for participant: {participant}")]
    MissingValue {
        policy: SplitPolicy,
        participant: ParticipantId,
    },
    #[error("invalid value '{value}' for participant: {participant}")]
    InvalidValue {
        participant: ParticipantId,
        value: String,
    },
    #[error("share weight must be a whole non-negative number, got {weight} for: {participant}")]
    InvalidWeight {
        participant: ParticipantId,
        weight: Decimal,
    },
    #[error("amount out of range")]
    Overflow,
}

/// How an expense total is distributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SplitPolicy {
    Equal,
    Exact,
    Percentage,
    Shares,
}

impl SplitPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            SplitPolicy::Equal => "equal",
            SplitPolicy::Exact => "exact",
            SplitPolicy::Percentage => "percentage",
            SplitPolicy::Shares => "shares",
        }
    }
}

impl fmt::Display for SplitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SplitPolicy {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" => Ok(SplitPolicy::Equal),
            "exact" => Ok(SplitPolicy::Exact),
            "percentage" => Ok(SplitPolicy::Percentage),
            "shares" => Ok(SplitPolicy::Shares),
            _ => Err(SplitError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Per-participant input for a split, tagged by policy.
///
/// Map-based inputs keep the order they were supplied in: the first entry is
/// the one that absorbs any rounding residual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum SplitInput {
    /// Everyone pays the same
    Equal { participants: Vec<ParticipantId> },
    /// Caller-supplied amount per participant
    Exact {
        #[serde(deserialize_with = "deserialize_unique")]
        #[schemars(with = "BTreeMap<String, f64>")]
        amounts: IndexMap<ParticipantId, Decimal>,
    },
    /// Percentage of the total per participant (expected to add up to 100)
    Percentage {
        #[serde(deserialize_with = "deserialize_unique")]
        #[schemars(with = "BTreeMap<String, f64>")]
        percentages: IndexMap<ParticipantId, Decimal>,
    },
    /// Whole-number weights per participant
    Shares {
        #[serde(deserialize_with = "deserialize_unique")]
        #[schemars(with = "BTreeMap<String, u32>")]
        weights: IndexMap<ParticipantId, u32>,
    },
}

impl SplitInput {
    pub fn policy(&self) -> SplitPolicy {
        match self {
            SplitInput::Equal { .. } => SplitPolicy::Equal,
            SplitInput::Exact { .. } => SplitPolicy::Exact,
            SplitInput::Percentage { .. } => SplitPolicy::Percentage,
            SplitInput::Shares { .. } => SplitPolicy::Shares,
        }
    }

    /// Participants in input order
    pub fn participants(&self) -> Vec<&ParticipantId> {
        match self {
            SplitInput::Equal { participants } => participants.iter().collect(),
            SplitInput::Exact { amounts } => amounts.keys().collect(),
            SplitInput::Percentage { percentages } => percentages.keys().collect(),
            SplitInput::Shares { weights } => weights.keys().collect(),
        }
    }

    /// Build an input from raw `(participant, value)` pairs.
    ///
    /// Values are ignored for `Equal` and required for every other policy.
    pub fn from_entries<I>(policy: SplitPolicy, entries: I) -> Result<Self, SplitError>
    where
        I: IntoIterator<Item = (ParticipantId, Option<String>)>,
    {
        let mut values: IndexMap<ParticipantId, Option<String>> = IndexMap::new();
        for (participant, value) in entries {
            if values.contains_key(&participant) {
                return Err(SplitError::DuplicateParticipant(participant));
            }
            values.insert(participant, value);
        }

        match policy {
            SplitPolicy::Equal => Ok(SplitInput::Equal {
                participants: values.into_keys().collect(),
            }),
            SplitPolicy::Exact => Ok(SplitInput::Exact {
                amounts: parse_values(policy, values)?,
            }),
            SplitPolicy::Percentage => Ok(SplitInput::Percentage {
                percentages: parse_values(policy, values)?,
            }),
            SplitPolicy::Shares => {
                let mut weights = IndexMap::with_capacity(values.len());
                for (participant, weight) in parse_values(policy, values)? {
                    let whole = u32::try_from(weight.normalize().mantissa())
                        .ok()
                        .filter(|_| weight.fract().is_zero());
                    match whole {
                        Some(w) => {
                            weights.insert(participant, w);
                        }
                        None => return Err(SplitError::InvalidWeight { participant, weight }),
                    }
                }
                Ok(SplitInput::Shares { weights })
            }
        }
    }
}

/// Participant map that rejects a repeated key instead of keeping the last one
fn deserialize_unique<'de, D, V>(deserializer: D) -> Result<IndexMap<ParticipantId, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct UniqueKeys<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueKeys<V> {
        type Value = IndexMap<ParticipantId, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of participant to value")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((participant, value)) = access.next_entry::<ParticipantId, V>()? {
                if map.contains_key(&participant) {
                    return Err(de::Error::custom(SplitError::DuplicateParticipant(participant)));
                }
                map.insert(participant, value);
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(UniqueKeys(PhantomData))
}

fn parse_values(
    policy: SplitPolicy,
    values: IndexMap<ParticipantId, Option<String>>,
) -> Result<IndexMap<ParticipantId, Decimal>, SplitError> {
    let mut parsed = IndexMap::with_capacity(values.len());
    for (participant, value) in values {
        let raw = value.ok_or_else(|| SplitError::MissingValue {
            policy,
            participant: participant.clone(),
        })?;
        let amount = money::parse_amount(&raw).map_err(|_| SplitError::InvalidValue {
            participant: participant.clone(),
            value: raw.clone(),
        })?;
        parsed.insert(participant, amount);
    }
    Ok(parsed)
}

/// Owed share per participant for one expense, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareAllocation(IndexMap<ParticipantId, Decimal>);

impl ShareAllocation {
    pub fn get(&self, participant: &str) -> Option<Decimal> {
        self.0.get(participant).copied()
    }

    pub fn total(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, Decimal)> {
        self.0.iter().map(|(p, amount)| (p, *amount))
    }

    /// Give the whole rounding residual to the first participant so the
    /// allocation adds up to `total` exactly.
    fn correct_residual(mut self, total: Decimal) -> Self {
        let residual = money::round(total - self.total());
        if !residual.is_zero() {
            if let Some((participant, share)) = self.0.first_mut() {
                *share += residual;
                log::debug!("Residual {} assigned to {}", residual, participant);
            }
        }
        self
    }
}

impl<'a> IntoIterator for &'a ShareAllocation {
    type Item = (&'a ParticipantId, &'a Decimal);
    type IntoIter = indexmap::map::Iter<'a, ParticipantId, Decimal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(ParticipantId, Decimal)> for ShareAllocation {
    fn from_iter<T: IntoIterator<Item = (ParticipantId, Decimal)>>(iter: T) -> Self {
        ShareAllocation(iter.into_iter().collect())
    }
}

/// Split `total` according to `input`.
///
/// Every policy except `Exact` guarantees the shares sum to `total`. Exact
/// amounts are only rounded; a mismatch against `total` is logged and left
/// for the caller to deal with.
pub fn compute_split(total: Decimal, input: &SplitInput) -> Result<ShareAllocation, SplitError> {
    let allocation = match input {
        SplitInput::Equal { participants } => split_equal(total, participants)?,
        SplitInput::Exact { amounts } => split_exact(total, amounts)?,
        SplitInput::Percentage { percentages } => split_percentage(total, percentages)?,
        SplitInput::Shares { weights } => split_shares(total, weights)?,
    };
    log::debug!(
        "Split {} by {} among {} participant(s)",
        total,
        input.policy(),
        allocation.len()
    );
    Ok(allocation)
}

/// Parse a policy name and raw entries, then split.
pub fn compute_split_named<I>(
    total: Decimal,
    policy: &str,
    entries: I,
) -> Result<ShareAllocation, SplitError>
where
    I: IntoIterator<Item = (ParticipantId, Option<String>)>,
{
    let policy: SplitPolicy = policy.parse()?;
    let input = SplitInput::from_entries(policy, entries)?;
    compute_split(total, &input)
}

fn split_equal(total: Decimal, participants: &[ParticipantId]) -> Result<ShareAllocation, SplitError> {
    if participants.is_empty() {
        return Err(SplitError::NoParticipants);
    }
    let count = Decimal::from(participants.len());
    let base = money::round(total.checked_div(count).ok_or(SplitError::Overflow)?);

    let mut shares = IndexMap::with_capacity(participants.len());
    for participant in participants {
        if shares.insert(participant.clone(), base).is_some() {
            return Err(SplitError::DuplicateParticipant(participant.clone()));
        }
    }
    Ok(ShareAllocation(shares).correct_residual(total))
}

fn split_exact(
    total: Decimal,
    amounts: &IndexMap<ParticipantId, Decimal>,
) -> Result<ShareAllocation, SplitError> {
    if amounts.is_empty() {
        return Err(SplitError::NoParticipants);
    }
    let allocation: ShareAllocation = amounts
        .iter()
        .map(|(participant, amount)| (participant.clone(), money::round(*amount)))
        .collect();
    let allocated = allocation.total();
    if (allocated - total).abs() >= EPSILON {
        log::warn!(
            "Exact split allocates {} but the total is {}",
            money::display_amount(allocated),
            money::display_amount(total)
        );
    }
    Ok(allocation)
}

fn split_percentage(
    total: Decimal,
    percentages: &IndexMap<ParticipantId, Decimal>,
) -> Result<ShareAllocation, SplitError> {
    if percentages.is_empty() {
        return Err(SplitError::NoParticipants);
    }
    let hundred = Decimal::ONE_HUNDRED;
    let mut shares = IndexMap::with_capacity(percentages.len());
    for (participant, pct) in percentages {
        let share = total
            .checked_mul(*pct)
            .and_then(|v| v.checked_div(hundred))
            .ok_or(SplitError::Overflow)?;
        shares.insert(participant.clone(), money::round(share));
    }
    Ok(ShareAllocation(shares).correct_residual(total))
}

fn split_shares(
    total: Decimal,
    weights: &IndexMap<ParticipantId, u32>,
) -> Result<ShareAllocation, SplitError> {
    let total_weight: u64 = weights.values().map(|w| u64::from(*w)).sum();
    if total_weight == 0 {
        return Err(SplitError::ZeroTotalWeight);
    }
    let total_weight = Decimal::from(total_weight);
    let mut shares = IndexMap::with_capacity(weights.len());
    for (participant, weight) in weights {
        let share = total
            .checked_mul(Decimal::from(*weight))
            .and_then(|v| v.checked_div(total_weight))
            .ok_or(SplitError::Overflow)?;
        shares.insert(participant.clone(), money::round(share));
    }
    Ok(ShareAllocation(shares).correct_residual(total))
}
