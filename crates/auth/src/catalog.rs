//! Built-in role catalog.

use crate::condition::Condition;
use crate::permissions::{Action, PermissionRule, Resource, Scope};
use crate::registry::RoleCatalog;
use crate::roles::{RoleDefinition, RoleKey};

use Action::*;

const CRUD_ASSIGN: &[Action] = &[Read, Create, Update, Assign];
const MANAGE: &[Action] = &[Read, Create, Update, Approve, Export, Assign];

fn rule(resource: Resource, actions: &[Action], scope: Scope) -> PermissionRule {
    PermissionRule::new(resource, actions, scope)
}

/// The catalog shipped with the application. `ADMIN` is the super-role.
pub fn default_catalog() -> RoleCatalog {
    use Resource::*;
    use Scope::{Organization as Org, Own, Project};

    let admin = RoleDefinition::new(RoleKey::ADMIN, "Administrator", Org)
        .rule(rule(Organizations, &[Create, Delete, Read, Update], Org));

    let org_admin = RoleDefinition::new(RoleKey::ORG_ADMIN, "Organization Admin", Org)
        .rule(rule(Organizations, &[Read, Update], Org))
        .rule(rule(Projects, &[Read, Create, Update], Org))
        .rule(rule(People, &[Read, Create, Update, Assign], Org))
        .rule(rule(Roles, &[Read, Create, Update], Org))
        .rule(rule(Settings, &[Read, Update], Org))
        .rule(rule(Reports, &[Read, Export], Org))
        .rule(rule(Inspections, &[Read, Export], Org));

    let hse_manager = RoleDefinition::new(RoleKey::HSE_MANAGER, "HSE Manager", Org)
        .rule(rule(Dashboard, &[Read], Org))
        .rule(rule(Reports, MANAGE, Org))
        .rule(rule(Inspections, MANAGE, Org))
        .rule(rule(Ptw, MANAGE, Org))
        .rule(rule(Checklists, &[Read, Create, Update, Export, Assign], Org))
        .rule(rule(Plans, MANAGE, Org))
        .rule(rule(Rams, MANAGE, Org))
        .rule(rule(Training, MANAGE, Org))
        .rule(rule(Actions, MANAGE, Org))
        .rule(rule(People, &[Read, Assign], Org));

    let supervisor = RoleDefinition::new(RoleKey::SUPERVISOR, "Supervisor", Project)
        .rule(rule(Reports, CRUD_ASSIGN, Project))
        .rule(rule(Inspections, CRUD_ASSIGN, Project))
        .rule(rule(Ptw, &[Read, Create, Update], Project))
        .rule(rule(Checklists, CRUD_ASSIGN, Project))
        .rule(rule(Tbt, CRUD_ASSIGN, Project))
        .rule(rule(Training, &[Read, Assign], Project))
        .rule(rule(Actions, &[Read, Update, Assign], Project));

    let hse_officer = RoleDefinition::new(RoleKey::HSE_OFFICER, "HSE Officer", Project)
        .rule(rule(Dashboard, &[Read], Project))
        .rule(rule(Reports, CRUD_ASSIGN, Project))
        .rule(rule(Inspections, CRUD_ASSIGN, Project))
        .rule(rule(Ptw, CRUD_ASSIGN, Project))
        .rule(rule(Checklists, CRUD_ASSIGN, Project))
        .rule(rule(Tbt, CRUD_ASSIGN, Project))
        .rule(rule(Actions, CRUD_ASSIGN, Project));

    let inspector = RoleDefinition::new(RoleKey::INSPECTOR, "Inspector", Project)
        .rule(rule(Inspections, &[Read, Create, Update], Project))
        .rule(rule(Checklists, &[Read, Create, Update], Project))
        .rule(rule(Reports, &[Read, Create], Project));

    let worker = RoleDefinition::new(RoleKey::WORKER, "Worker", Own)
        .rule(rule(Reports, &[Read, Create, Update], Own).when(Condition::IsOwner))
        .rule(rule(Ptw, &[Read, Create, Update], Own).when(Condition::IsOwner))
        .rule(rule(Checklists, &[Read, Create], Own))
        .rule(rule(Tbt, &[Read], Own))
        .rule(rule(Training, &[Read, Update], Own))
        .rule(rule(Certification, &[Read, Update], Own));

    let client_viewer = RoleDefinition::new(RoleKey::CLIENT_VIEWER, "Client Viewer", Project)
        .rule(rule(Dashboard, &[Read], Project))
        .rule(rule(Reports, &[Read, Export], Project))
        .rule(rule(Inspections, &[Read, Export], Project))
        .rule(rule(Plans, &[Read, Export], Project))
        .rule(rule(Rams, &[Read, Export], Project));

    let site_lead = RoleDefinition::new(RoleKey::CUSTOM_SITE_LEAD, "Custom Site Lead", Project)
        .inherits(RoleKey::SUPERVISOR)
        .rule(rule(Reports, CRUD_ASSIGN, Project))
        .rule(rule(Inspections, CRUD_ASSIGN, Project))
        .rule(rule(Ptw, CRUD_ASSIGN, Project))
        .rule(rule(Actions, CRUD_ASSIGN, Project));

    RoleCatalog {
        super_role: RoleKey::ADMIN,
        roles: vec![
            admin,
            org_admin,
            hse_manager,
            supervisor,
            hse_officer,
            inspector,
            worker,
            client_viewer,
            site_lead,
        ],
    }
}
