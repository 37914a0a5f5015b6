//! Form logic hierarchy.
//!
//! Entry-point triggers and main functions are expanded into call trees.
//! Expansion threads a persistent visited set along the current path and
//! stops at [`MAX_CALL_DEPTH`], so cyclic call graphs still produce finite
//! trees.

use crate::classification::ProgramUnitEnriched;
use crate::core::{ImpactScore, LogicCategory};
use crate::triggers::TriggerAnalysis;
use im::HashSet;
use serde::Serialize;
use std::collections::HashMap;

/// Deepest `call_depth` any node may have.
pub const MAX_CALL_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Trigger,
    ProgramUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyNode {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    pub description: String,
    pub classification: String,
    pub impact_score: ImpactScore,
    pub children: Vec<HierarchyNode>,
    pub call_depth: usize,
}

impl HierarchyNode {
    /// Deepest `call_depth` in this subtree.
    pub fn max_depth(&self) -> usize {
        self.children
            .iter()
            .map(HierarchyNode::max_depth)
            .max()
            .unwrap_or(self.call_depth)
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(HierarchyNode::node_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormLogicHierarchy {
    pub entry_points: Vec<HierarchyNode>,
    pub core_controllers: Vec<HierarchyNode>,
    pub supporting_utilities: Vec<HierarchyNode>,
    pub ui_glue: Vec<HierarchyNode>,
}

struct Builder<'a> {
    units: HashMap<&'a str, &'a ProgramUnitEnriched>,
}

impl<'a> Builder<'a> {
    fn new(units: &'a [ProgramUnitEnriched]) -> Self {
        let mut by_name = HashMap::new();
        for unit in units {
            // Overloads share a name; the first declaration represents them.
            by_name.entry(unit.name.as_str()).or_insert(unit);
        }
        Self { units: by_name }
    }

    fn unit_node(&self, name: &str, depth: usize, visited: &HashSet<String>) -> HierarchyNode {
        let unit = self.units.get(name);
        let expand = depth < MAX_CALL_DEPTH && !visited.contains(name);

        let children = match unit {
            Some(unit) if expand => {
                let path = visited.update(name.to_string());
                self.children(&unit.dependencies, depth + 1, &path)
            }
            _ => Vec::new(),
        };

        HierarchyNode {
            node_type: NodeType::ProgramUnit,
            name: name.to_string(),
            description: unit.map_or_else(String::new, |u| u.business_responsibility.clone()),
            classification: unit
                .map_or(LogicCategory::Unknown, |u| u.classification)
                .to_string(),
            impact_score: unit.map_or(ImpactScore::Low, |u| u.impact_score),
            children,
            call_depth: depth,
        }
    }

    fn children(
        &self,
        names: &[String],
        depth: usize,
        visited: &HashSet<String>,
    ) -> Vec<HierarchyNode> {
        names
            .iter()
            .map(|name| self.unit_node(name, depth, visited))
            .collect()
    }

    fn trigger_node(&self, trigger: &TriggerAnalysis, expand: bool) -> HierarchyNode {
        let children = if expand {
            self.children(&trigger.called_program_units, 1, &HashSet::new())
        } else {
            Vec::new()
        };

        HierarchyNode {
            node_type: NodeType::Trigger,
            name: trigger.name.clone(),
            description: trigger.responsibility.clone(),
            classification: trigger.category.to_string(),
            impact_score: trigger.impact_score,
            children,
            call_depth: 0,
        }
    }
}

pub fn build_hierarchy(
    triggers: &[TriggerAnalysis],
    units: &[ProgramUnitEnriched],
) -> FormLogicHierarchy {
    let builder = Builder::new(units);

    let entry_points = triggers
        .iter()
        .filter(|t| t.is_entry_point)
        .map(|t| builder.trigger_node(t, true))
        .collect();

    let core_controllers = units
        .iter()
        .filter(|u| u.is_main_function)
        .map(|u| builder.unit_node(&u.name, 0, &HashSet::new()))
        .collect();

    let supporting_utilities = units
        .iter()
        .filter(|u| !u.is_main_function && u.classification == LogicCategory::UtilityHelper)
        .map(|u| builder.unit_node(&u.name, MAX_CALL_DEPTH, &HashSet::new()))
        .map(|node| HierarchyNode {
            call_depth: 0,
            ..node
        })
        .collect();

    let ui_glue = triggers
        .iter()
        .filter(|t| !t.is_entry_point && t.impact_score == ImpactScore::Low)
        .map(|t| builder.trigger_node(t, false))
        .collect();

    FormLogicHierarchy {
        entry_points,
        core_controllers,
        supporting_utilities,
        ui_glue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UnitType;

    fn unit(name: &str, deps: &[&str]) -> ProgramUnitEnriched {
        ProgramUnitEnriched {
            name: name.into(),
            unit_type: UnitType::Procedure,
            parameters: vec![],
            return_type: None,
            line_count: 5,
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            called_by: vec![],
            is_main_function: false,
            main_function_reason: None,
            business_responsibility: format!("does {name}"),
            classification: LogicCategory::BusinessLogic,
            impact_score: ImpactScore::Medium,
            complexity: 3,
            risk_flags: vec![],
            controls_transaction: false,
        }
    }

    #[test]
    fn test_cycle_terminates_at_revisit() {
        let mut a = unit("A", &["B"]);
        a.is_main_function = true;
        let units = vec![a, unit("B", &["A"])];
        let hierarchy = build_hierarchy(&[], &units);

        let root = &hierarchy.core_controllers[0];
        assert_eq!(root.name, "A");
        let b = &root.children[0];
        assert_eq!((b.name.as_str(), b.call_depth), ("B", 1));
        let a_again = &b.children[0];
        assert_eq!((a_again.name.as_str(), a_again.call_depth), ("A", 2));
        assert!(a_again.children.is_empty());
    }

    #[test]
    fn test_depth_is_capped() {
        let mut root = unit("U0", &["U1"]);
        root.is_main_function = true;
        let units = vec![
            root,
            unit("U1", &["U2"]),
            unit("U2", &["U3"]),
            unit("U3", &["U4"]),
            unit("U4", &["U5"]),
            unit("U5", &[]),
        ];
        let hierarchy = build_hierarchy(&[], &units);
        assert_eq!(hierarchy.core_controllers[0].max_depth(), MAX_CALL_DEPTH);
        assert_eq!(hierarchy.core_controllers[0].node_count(), 4);
    }

    #[test]
    fn test_self_recursion() {
        let mut a = unit("A", &["A"]);
        a.is_main_function = true;
        let hierarchy = build_hierarchy(&[], &[a]);
        let root = &hierarchy.core_controllers[0];
        assert_eq!(root.children.len(), 1);
        assert!(root.children[0].children.is_empty());
    }

    #[test]
    fn test_utilities_are_leaves() {
        let mut util = unit("FMT", &["A"]);
        util.classification = LogicCategory::UtilityHelper;
        let hierarchy = build_hierarchy(&[], &[util, unit("A", &[])]);
        assert_eq!(hierarchy.supporting_utilities.len(), 1);
        assert!(hierarchy.supporting_utilities[0].children.is_empty());
        assert_eq!(hierarchy.supporting_utilities[0].call_depth, 0);
    }
}
