//! # Security Group Permission Diff
//!
//! Security group rules are a set keyed by `(protocol, fromPort, toPort)`.
//! Each key owns four sub-sets (IPv4 ranges, IPv6 ranges, prefix lists and
//! group pairs), every entry carrying an optional description.
//!
//! Rules authored as several entries with the same key are merged before
//! diffing, so `[tcp 80 a, tcp 80 b]` behaves like `[tcp 80 [a, b]]`.

use crate::crd::ec2::{IpPermission, IpRange, Ipv6Range, PrefixListId, UserIdGroupPair};
use std::collections::{BTreeMap, BTreeSet};

/// Port value AWS uses for "all"
const ALL: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleKey {
    pub protocol: String,
    pub from_port: i32,
    pub to_port: i32,
}

impl RuleKey {
    pub fn of(permission: &IpPermission) -> Self {
        Self {
            protocol: permission.ip_protocol.to_lowercase(),
            from_port: permission.from_port.unwrap_or(ALL),
            to_port: permission.to_port.unwrap_or(ALL),
        }
    }

    fn port(&self, port: i32) -> Option<i32> {
        (self.protocol != "-1").then_some(port)
    }
}

/// Identity of a group pair; the owning account is not part of it because
/// AWS fills it in on describe. Pairs in a VPC must name their group by id,
/// AWS returns no name for them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PairKey {
    group_id: Option<String>,
    group_name: Option<String>,
    vpc_peering_connection_id: Option<String>,
}

impl PairKey {
    fn of(pair: &UserIdGroupPair) -> Self {
        Self {
            group_id: pair.group_id.clone(),
            // a group id identifies the group on its own
            group_name: pair.group_id.is_none().then(|| pair.group_name.clone()).flatten(),
            vpc_peering_connection_id: pair.vpc_peering_connection_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Entries {
    ipv4: BTreeMap<String, Option<String>>,
    ipv6: BTreeMap<String, Option<String>>,
    prefix_lists: BTreeMap<String, Option<String>>,
    pairs: BTreeMap<PairKey, UserIdGroupPair>,
}

impl Entries {
    fn is_empty(&self) -> bool {
        self.ipv4.is_empty()
            && self.ipv6.is_empty()
            && self.prefix_lists.is_empty()
            && self.pairs.is_empty()
    }

    fn merge(&mut self, permission: &IpPermission) {
        for range in &permission.ip_ranges {
            self.ipv4.insert(range.cidr_ip.clone(), range.description.clone());
        }
        for range in &permission.ipv6_ranges {
            self.ipv6
                .insert(range.cidr_ipv6.clone(), range.description.clone());
        }
        for prefix in &permission.prefix_list_ids {
            self.prefix_lists
                .insert(prefix.prefix_list_id.clone(), prefix.description.clone());
        }
        for pair in &permission.user_id_group_pairs {
            let pair = UserIdGroupPair {
                group_id_ref: None,
                group_id_selector: None,
                ..pair.clone()
            };
            self.pairs.insert(PairKey::of(&pair), pair);
        }
    }

    fn into_permission(self, key: &RuleKey) -> IpPermission {
        IpPermission {
            ip_protocol: key.protocol.clone(),
            from_port: key.port(key.from_port),
            to_port: key.port(key.to_port),
            ip_ranges: self
                .ipv4
                .into_iter()
                .map(|(cidr_ip, description)| IpRange {
                    cidr_ip,
                    description,
                })
                .collect(),
            ipv6_ranges: self
                .ipv6
                .into_iter()
                .map(|(cidr_ipv6, description)| Ipv6Range {
                    cidr_ipv6,
                    description,
                })
                .collect(),
            prefix_list_ids: self
                .prefix_lists
                .into_iter()
                .map(|(prefix_list_id, description)| PrefixListId {
                    prefix_list_id,
                    description,
                })
                .collect(),
            user_id_group_pairs: self.pairs.into_values().collect(),
        }
    }
}

/// Group rules by key, merging duplicates and dropping rules with no entries
fn group(permissions: &[IpPermission]) -> BTreeMap<RuleKey, Entries> {
    let mut grouped: BTreeMap<RuleKey, Entries> = BTreeMap::new();
    for permission in permissions {
        grouped
            .entry(RuleKey::of(permission))
            .or_default()
            .merge(permission);
    }
    grouped.retain(|_, entries| !entries.is_empty());
    grouped
}

/// Canonical form of a rule list: one rule per key, entries sorted
pub fn normalize(permissions: &[IpPermission]) -> Vec<IpPermission> {
    group(permissions)
        .into_iter()
        .map(|(key, entries)| entries.into_permission(&key))
        .collect()
}

/// Rules to authorize and revoke
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermissionDiff {
    /// Entries missing from the security group, or present with another description
    pub add: Vec<IpPermission>,
    /// Entries the security group has that the spec does not
    pub remove: Vec<IpPermission>,
    /// Observed entries whose description changed; revoke before authorizing `add`
    pub stale: Vec<IpPermission>,
}

impl PermissionDiff {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Moves entries of `want` missing from `have` into `missing`, and entries
/// present in `have` with a different value into `changed` (as observed)
fn split<K: Ord + Clone, V: PartialEq + Clone>(
    want: &BTreeMap<K, V>,
    have: &BTreeMap<K, V>,
    missing: &mut BTreeMap<K, V>,
    changed: &mut BTreeMap<K, V>,
) {
    for (id, value) in want {
        match have.get(id) {
            None => {
                missing.insert(id.clone(), value.clone());
            }
            Some(current) if current != value => {
                missing.insert(id.clone(), value.clone());
                changed.insert(id.clone(), current.clone());
            }
            Some(_) => {}
        }
    }
}

fn absent<K: Ord + Clone, V: Clone>(have: &BTreeMap<K, V>, want: &BTreeMap<K, V>) -> BTreeMap<K, V> {
    have.iter()
        .filter(|(id, _)| !want.contains_key(*id))
        .map(|(id, value)| (id.clone(), value.clone()))
        .collect()
}

/// Pairs compare on description only; other fields are identity or filled in by AWS
fn pair_descriptions(pairs: &BTreeMap<PairKey, UserIdGroupPair>) -> BTreeMap<PairKey, Option<String>> {
    pairs
        .iter()
        .map(|(key, pair)| (key.clone(), pair.description.clone()))
        .collect()
}

/// Observed pairs carry the group id even when the rule was authorized by
/// name. Pairs whose group `want` names without an id are keyed by name.
fn align_pair_names(want: &[IpPermission], have: &[IpPermission]) -> Vec<IpPermission> {
    let desired = || want.iter().flat_map(|p| &p.user_id_group_pairs);
    let ids: BTreeSet<&str> = desired().filter_map(|p| p.group_id.as_deref()).collect();
    let names: BTreeSet<&str> = desired()
        .filter(|p| p.group_id.is_none())
        .filter_map(|p| p.group_name.as_deref())
        .collect();
    if names.is_empty() {
        return have.to_vec();
    }
    have.iter()
        .map(|permission| {
            let mut permission = permission.clone();
            for pair in &mut permission.user_id_group_pairs {
                let named = pair.group_name.as_deref().is_some_and(|n| names.contains(n));
                let by_id = pair.group_id.as_deref().is_some_and(|id| ids.contains(id));
                if named && !by_id {
                    pair.group_id = None;
                }
            }
            permission
        })
        .collect()
}

/// Diff desired rules against the rules observed on the security group
pub fn diff_permissions(want: &[IpPermission], have: &[IpPermission]) -> PermissionDiff {
    let have = group(&align_pair_names(want, have));
    let want = group(want);
    let empty = Entries::default();
    let mut diff = PermissionDiff::default();

    for (key, desired) in &want {
        let current = have.get(key).unwrap_or(&empty);
        let mut add = Entries::default();
        let mut stale = Entries::default();

        split(&desired.ipv4, &current.ipv4, &mut add.ipv4, &mut stale.ipv4);
        split(&desired.ipv6, &current.ipv6, &mut add.ipv6, &mut stale.ipv6);
        split(
            &desired.prefix_lists,
            &current.prefix_lists,
            &mut add.prefix_lists,
            &mut stale.prefix_lists,
        );

        let (mut missing, mut changed) = (BTreeMap::new(), BTreeMap::new());
        split(
            &pair_descriptions(&desired.pairs),
            &pair_descriptions(&current.pairs),
            &mut missing,
            &mut changed,
        );
        add.pairs = desired
            .pairs
            .iter()
            .filter(|(id, _)| missing.contains_key(*id))
            .map(|(id, pair)| (id.clone(), pair.clone()))
            .collect();
        stale.pairs = current
            .pairs
            .iter()
            .filter(|(id, _)| changed.contains_key(*id))
            .map(|(id, pair)| (id.clone(), pair.clone()))
            .collect();

        if !add.is_empty() {
            diff.add.push(add.into_permission(key));
        }
        if !stale.is_empty() {
            diff.stale.push(stale.into_permission(key));
        }
    }

    for (key, current) in &have {
        let desired = want.get(key).unwrap_or(&empty);
        let remove = Entries {
            ipv4: absent(&current.ipv4, &desired.ipv4),
            ipv6: absent(&current.ipv6, &desired.ipv6),
            prefix_lists: absent(&current.prefix_lists, &desired.prefix_lists),
            pairs: absent(&current.pairs, &desired.pairs),
        };
        if !remove.is_empty() {
            diff.remove.push(remove.into_permission(key));
        }
    }

    diff
}

/// Same rule set, ignoring ordering and how entries are split across rules
pub fn permissions_equal(a: &[IpPermission], b: &[IpPermission]) -> bool {
    diff_permissions(a, b).is_empty()
}
