/// Access-control role carried in the bearer token. Orthogonal to the line
/// manager relation: a role never makes someone the approver of an application.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    System = 4,
    ApiUser = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::System),
            5 => Some(Role::ApiUser),
            _ => None,
        }
    }

    /// May read any employee's leave and edit balances directly.
    pub fn can_administer_leave(self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_map_to_roles() {
        assert_eq!(Role::from_id(2), Some(Role::Hr));
        assert_eq!(Role::from_id(9), None);
    }

    #[test]
    fn only_hr_and_admin_administer_leave() {
        assert!(Role::Admin.can_administer_leave());
        assert!(Role::Hr.can_administer_leave());
        assert!(!Role::Employee.can_administer_leave());
        assert!(!Role::System.can_administer_leave());
    }
}
