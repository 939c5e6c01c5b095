use serde::{Deserialize, Serialize};

/// One node of a query tree as clients post it: `{"val": …, "left": …, "right": …}`.
///
/// A query is a chain of clause nodes linked through `left`, the first one
/// always `oslc.select`; each clause keeps its body in `right`. Lists inside
/// a body are right-nested under `,` (or `and` for `oslc.where`), nested
/// selects use `{` with the property on the left, and comparisons and prefix
/// bindings use their operator with operands on either side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Node {
    pub(crate) val: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) left: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) right: Option<Box<Node>>,
}

impl Node {
    pub(crate) fn leaf(val: impl Into<String>) -> Node {
        Node {
            val: val.into(),
            left: None,
            right: None,
        }
    }

    pub(crate) fn branch(val: impl Into<String>, left: Option<Node>, right: Option<Node>) -> Node {
        Node {
            val: val.into(),
            left: left.map(Box::new),
            right: right.map(Box::new),
        }
    }

    /// Folds `items` into a right-nested chain joined by `separator`.
    pub(crate) fn list(separator: &str, items: Vec<Node>) -> Option<Node> {
        items
            .into_iter()
            .rev()
            .fold(None, |rest, item| match rest {
                None => Some(item),
                Some(rest) => Some(Node::branch(separator, Some(item), Some(rest))),
            })
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Unfolds a chain built by [`Node::list`].
    pub(crate) fn items<'a>(&'a self, separator: &str) -> Vec<&'a Node> {
        let mut items = vec![];
        let mut node = self;
        loop {
            match (&node.left, &node.right) {
                (Some(item), Some(rest)) if node.val == separator => {
                    items.push(item.as_ref());
                    node = rest;
                }
                _ => {
                    items.push(node);
                    return items;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::Node;

    #[test]
    fn lists_unfold_in_order() {
        let list = Node::list(",", vec![Node::leaf("a"), Node::leaf("b"), Node::leaf("c")])
            .expect("non-empty");
        let vals: Vec<_> = list.items(",").iter().map(|n| n.val.as_str()).collect();
        assert_eq!(vals, ["a", "b", "c"]);
        assert_eq!(Node::list(",", vec![]), None);
    }

    #[test]
    fn posted_trees_accept_nulls_and_missing_children() -> Result<()> {
        let node: Node = serde_json::from_str(
            r#"{"val": "oslc.select", "left": null, "right": {"val": "*"}}"#,
        )?;
        assert_eq!(node, Node::branch("oslc.select", None, Some(Node::leaf("*"))));
        Ok(())
    }
}
