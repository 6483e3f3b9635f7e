//! Realm-level group policy
//!
//! Two knobs shared by every realm:
//! - `assign-groups`: groups granted to every authenticated user
//! - `group-mapping`: aliases of the form `a,b->x;c->y`, meaning members of
//!   `a` or `b` are also members of `x`, members of `c` also of `y`

use std::collections::HashMap;
use warden_core::{Error, RealmProperties, Result, PARAM_ASSIGN_GROUPS, PARAM_GROUP_MAPPING};

const GROUPS_SEP: char = ',';
const MAPPING_SEP: char = ';';
const MAPPING_ARROW: &str = "->";

/// Transitive group-name mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMapper {
    mappings: HashMap<String, Vec<String>>,
}

impl GroupMapper {
    /// Parse `src1,src2->target;src3->target2`
    pub fn parse(mapping: &str) -> Result<Self> {
        let mut mapper = Self::default();

        for entry in mapping.split(MAPPING_SEP).map(str::trim).filter(|e| !e.is_empty()) {
            let (sources, target) = entry.split_once(MAPPING_ARROW).ok_or_else(|| {
                Error::BadRealm(format!("Invalid group mapping entry: {}", entry))
            })?;

            let target = target.trim();
            if target.is_empty() {
                return Err(Error::BadRealm(format!(
                    "Group mapping entry has no target: {}",
                    entry
                )));
            }

            for source in sources.split(GROUPS_SEP).map(str::trim).filter(|s| !s.is_empty()) {
                if source == target {
                    return Err(Error::BadRealm(format!(
                        "Group {} cannot be mapped to itself",
                        source
                    )));
                }

                let targets = mapper.mappings.entry(source.to_string()).or_default();
                if !targets.iter().any(|t| t == target) {
                    targets.push(target.to_string());
                }
            }
        }

        Ok(mapper)
    }

    /// All groups `group` maps to, following chains, each listed once.
    pub fn mapped_groups(&self, group: &str) -> Vec<String> {
        let mut result = Vec::new();
        self.collect(group, &mut result);
        result.retain(|g| g != group);
        result
    }

    fn collect(&self, group: &str, result: &mut Vec<String>) {
        if let Some(targets) = self.mappings.get(group) {
            for target in targets {
                if !result.contains(target) {
                    result.push(target.clone());
                    self.collect(target, result);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Assigned groups and group mapping for one realm
#[derive(Debug, Clone, Default)]
pub struct GroupPolicy {
    assign_groups: Vec<String>,
    mapper: Option<GroupMapper>,
}

impl GroupPolicy {
    pub fn from_properties(props: &RealmProperties) -> Result<Self> {
        let mut assign_groups: Vec<String> = Vec::new();
        if let Some(list) = props.get(PARAM_ASSIGN_GROUPS) {
            for group in list.split(GROUPS_SEP).map(str::trim).filter(|g| !g.is_empty()) {
                if !assign_groups.iter().any(|g| g == group) {
                    assign_groups.push(group.to_string());
                }
            }
        }

        let mapper = props
            .get(PARAM_GROUP_MAPPING)
            .map(GroupMapper::parse)
            .transpose()?;

        Ok(Self {
            assign_groups,
            mapper,
        })
    }

    pub fn assign_groups(&self) -> &[String] {
        &self.assign_groups
    }

    /// Append assigned groups not already present.
    pub fn add_assign_groups(&self, mut groups: Vec<String>) -> Vec<String> {
        for group in &self.assign_groups {
            if !groups.contains(group) {
                groups.push(group.clone());
            }
        }
        groups
    }

    /// Each group is kept and followed by the groups it maps to.
    pub fn add_mapped_groups(&self, groups: Vec<String>) -> Vec<String> {
        let mapper = match &self.mapper {
            Some(mapper) => mapper,
            None => return groups,
        };

        let mut result = Vec::with_capacity(groups.len());
        for group in groups {
            let mapped = mapper.mapped_groups(&group);
            result.push(group);
            result.extend(mapped);
        }
        result
    }

    /// Assigned groups first, then mapping, as applied after a login.
    pub fn apply(&self, groups: Vec<String>) -> Vec<String> {
        self.add_mapped_groups(self.add_assign_groups(groups))
    }
}
