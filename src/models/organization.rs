use super::actor::Actor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A job title within the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Designation {
    pub name: String,
}

impl Designation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Department/team grouping a position may belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

/// One position a user holds. Department and team may come from the
/// position's group or be set directly; the group wins when both exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub designation: Designation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

impl Position {
    pub fn new(designation: impl Into<String>) -> Self {
        Self {
            designation: Designation::new(designation),
            group: None,
            department: None,
            team: None,
        }
    }

    pub fn with_group(mut self, department: impl Into<String>, team: impl Into<String>) -> Self {
        self.group = Some(Group {
            department: Some(department.into()),
            team: Some(team.into()),
        });
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn department(&self) -> Option<&str> {
        self.group
            .as_ref()
            .and_then(|g| g.department.as_deref())
            .or(self.department.as_deref())
    }

    pub fn team(&self) -> Option<&str> {
        self.group
            .as_ref()
            .and_then(|g| g.team.as_deref())
            .or(self.team.as_deref())
    }
}

/// The sole source of role-derived permission facts: the caller resolves
/// the user's positions and hands them in here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationContext {
    pub organization_id: String,
    #[serde(default)]
    pub positions: Vec<Position>,
}

impl OrganizationContext {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            positions: Vec::new(),
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.positions.push(position);
        self
    }

    /// All actor tags the user holds. Always contains the baseline
    /// [`Actor::Requestor`].
    pub fn actors(&self) -> HashSet<Actor> {
        let mut actors: HashSet<Actor> = HashSet::from([Actor::Requestor]);
        for position in &self.positions {
            actors.extend(Actor::from_designation(&position.designation.name));
        }
        actors
    }

    pub fn departments(&self) -> Vec<&str> {
        self.positions.iter().filter_map(|p| p.department()).collect()
    }

    pub fn teams(&self) -> Vec<&str> {
        self.positions.iter().filter_map(|p| p.team()).collect()
    }

    pub fn designation_names(&self) -> Vec<&str> {
        self.positions
            .iter()
            .map(|p| p.designation.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_wins_over_direct_fields() {
        let position = Position::new("Analyst")
            .with_department("ignored")
            .with_group("Risk", "Credit Risk");
        assert_eq!(position.department(), Some("Risk"));
        assert_eq!(position.team(), Some("Credit Risk"));
    }

    #[test]
    fn test_every_user_is_a_requestor() {
        let org = OrganizationContext::new("org-1");
        assert!(org.actors().contains(&Actor::Requestor));
    }

    #[test]
    fn test_actors_union_across_positions() {
        let org = OrganizationContext::new("org-1")
            .with_position(Position::new("Branch Manager"))
            .with_position(Position::new("Data Analyst"));
        let actors = org.actors();
        assert!(actors.contains(&Actor::Approver));
        assert!(actors.contains(&Actor::Analyzer));
        assert!(actors.contains(&Actor::Requestor));
    }
}
