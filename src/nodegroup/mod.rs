/// Node group and tag descriptors supplied on the command line
///
/// A node group descriptor is a comma-separated list of `key=value` pairs,
/// e.g. `name=ng1,instance-type=t2.medium,nodes=3,disk=20`.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing node group or tag descriptors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeGroupError {
    #[error("invalid node group format: {descriptor}")]
    MalformedDescriptor { descriptor: String },

    #[error("invalid node group field: {field}")]
    UnknownField { field: String },

    #[error("failed to parse nodes value: {value}")]
    InvalidNodeCount { value: String },

    #[error("failed to parse disk value: {value}")]
    InvalidDiskSize { value: String },

    #[error("invalid tag format: {tag}")]
    MalformedTag { tag: String },
}

/// One requested pool of compute nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeGroupSpec {
    name: String,
    instance_type: String,
    nodes: i64,
    disk: i64,
}

impl NodeGroupSpec {
    /// Build a node group from already-validated values
    pub fn new(
        name: impl Into<String>,
        instance_type: impl Into<String>,
        nodes: i64,
        disk: i64,
    ) -> Self {
        Self {
            name: name.into(),
            instance_type: instance_type.into(),
            nodes,
            disk,
        }
    }

    /// Node group name, empty when the backend should pick one
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance type, empty when the distribution default applies
    pub fn instance_type(&self) -> &str {
        &self.instance_type
    }

    pub fn nodes(&self) -> i64 {
        self.nodes
    }

    /// Disk size in GiB
    pub fn disk(&self) -> i64 {
        self.disk
    }
}

/// A `key=value` tag applied to a cluster or VM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Parse every descriptor into a node group.
///
/// Fails on the first invalid descriptor; no partial result is returned.
pub fn parse_node_groups<S: AsRef<str>>(
    descriptors: &[S],
) -> Result<Vec<NodeGroupSpec>, NodeGroupError> {
    descriptors
        .iter()
        .map(|d| parse_node_group(d.as_ref()))
        .collect()
}

/// Parse a single node group descriptor
pub fn parse_node_group(descriptor: &str) -> Result<NodeGroupSpec, NodeGroupError> {
    let mut ng = NodeGroupSpec::default();

    for field in descriptor.split(',') {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| NodeGroupError::MalformedDescriptor {
                descriptor: descriptor.to_string(),
            })?;

        // Repeated keys overwrite earlier values
        match key {
            "name" => ng.name = value.to_string(),
            "instance-type" => ng.instance_type = value.to_string(),
            "nodes" => {
                ng.nodes = value.parse().map_err(|_| NodeGroupError::InvalidNodeCount {
                    value: value.to_string(),
                })?;
            }
            "disk" => {
                ng.disk = value.parse().map_err(|_| NodeGroupError::InvalidDiskSize {
                    value: value.to_string(),
                })?;
            }
            other => {
                return Err(NodeGroupError::UnknownField {
                    field: other.to_string(),
                })
            }
        }
    }

    Ok(ng)
}

/// Parse `key=value` tags, splitting at the first `=`
pub fn parse_tags<S: AsRef<str>>(tags: &[S]) -> Result<Vec<Tag>, NodeGroupError> {
    tags.iter()
        .map(|tag| {
            let tag = tag.as_ref();
            tag.split_once('=')
                .map(|(key, value)| Tag {
                    key: key.to_string(),
                    value: value.to_string(),
                })
                .ok_or_else(|| NodeGroupError::MalformedTag { tag: tag.to_string() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_descriptor() {
        let parsed =
            parse_node_groups(&["name=ng1,instance-type=t2.medium,nodes=3,disk=20"]).unwrap();
        assert_eq!(parsed, vec![NodeGroupSpec::new("ng1", "t2.medium", 3, 20)]);
    }

    #[test]
    fn test_partial_descriptors_use_defaults() {
        let parsed = parse_node_groups(&[
            "name=ng1,instance-type=t2.medium,nodes=3",
            "name=ng1,nodes=3",
            "nodes=3",
        ])
        .unwrap();

        assert_eq!(
            parsed,
            vec![
                NodeGroupSpec::new("ng1", "t2.medium", 3, 0),
                NodeGroupSpec::new("ng1", "", 3, 0),
                NodeGroupSpec::new("", "", 3, 0),
            ]
        );
        assert_eq!(parsed[2].name(), "");
        assert_eq!(parsed[2].disk(), 0);
    }

    #[test]
    fn test_keys_in_any_order() {
        let parsed = parse_node_group("disk=100,nodes=2,instance-type=m6i.large,name=gpu").unwrap();
        assert_eq!(parsed, NodeGroupSpec::new("gpu", "m6i.large", 2, 100));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let parsed = parse_node_group("name=a=b").unwrap();
        assert_eq!(parsed.name(), "a=b");
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let parsed = parse_node_group("nodes=1,nodes=4").unwrap();
        assert_eq!(parsed.nodes(), 4);
    }

    #[test]
    fn test_signed_counts_accepted() {
        let parsed = parse_node_group("nodes=+2,disk=-1").unwrap();
        assert_eq!(parsed.nodes(), 2);
        assert_eq!(parsed.disk(), -1);
    }

    #[test]
    fn test_unknown_field() {
        let err = parse_node_groups(&[
            "name=ng1,instance-type=t2.medium,nodes=3,disk=20,invalid=invalid",
        ])
        .unwrap_err();
        assert_eq!(
            err,
            NodeGroupError::UnknownField {
                field: "invalid".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_node_count() {
        let err = parse_node_groups(&["name=ng1,instance-type=t2.medium,nodes=invalid,disk=20"])
            .unwrap_err();
        assert!(matches!(err, NodeGroupError::InvalidNodeCount { .. }));
    }

    #[test]
    fn test_invalid_disk_size() {
        let err = parse_node_groups(&["name=ng1,instance-type=t2.medium,nodes=3,disk=invalid"])
            .unwrap_err();
        assert!(matches!(err, NodeGroupError::InvalidDiskSize { .. }));
        assert_eq!(err.to_string(), "failed to parse disk value: invalid");
    }

    #[test]
    fn test_malformed_descriptor() {
        let err = parse_node_groups(&["invalid"]).unwrap_err();
        assert!(matches!(err, NodeGroupError::MalformedDescriptor { .. }));

        assert!(matches!(
            parse_node_group(""),
            Err(NodeGroupError::MalformedDescriptor { .. })
        ));
        assert!(matches!(
            parse_node_group("nodes=3,oops"),
            Err(NodeGroupError::MalformedDescriptor { .. })
        ));
    }

    #[test]
    fn test_first_violation_reported() {
        let err = parse_node_group("nodes=x,bogus=1").unwrap_err();
        assert!(matches!(err, NodeGroupError::InvalidNodeCount { .. }));
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let result = parse_node_groups(&["nodes=3", "name=ng2,nodes=2", "disk=big"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_batch() {
        let empty: [&str; 0] = [];
        assert_eq!(parse_node_groups(&empty).unwrap(), vec![]);
    }

    #[test]
    fn test_order_preserved() {
        let parsed = parse_node_groups(&["name=a", "name=b", "name=c"]).unwrap();
        let names: Vec<_> = parsed.iter().map(|ng| ng.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags(&["env=dev", "owner=team=a"]).unwrap();
        assert_eq!(tags[0].key, "env");
        assert_eq!(tags[0].value, "dev");
        assert_eq!(tags[1].value, "team=a");

        assert_eq!(
            parse_tags(&["nokey"]).unwrap_err(),
            NodeGroupError::MalformedTag {
                tag: "nokey".to_string()
            }
        );
    }
}
