//! Role policy: which role may run which operation

use super::enums::Role;

/// Operations checked at the service entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ViewCatalog,
    ManageCatalog,
    ManageStudents,
    ManageStaff,
    CreateManualLoan,
    ManualReturn,
    ConfirmReturn,
    ListLoans,
    ViewReports,
    UseCart,
    SelfBorrow,
    SelfReturn,
    RateLoan,
    ViewOwnLoans,
}

impl Operation {
    /// Student self-service, gated on the account's active flag
    pub fn is_self_service(&self) -> bool {
        matches!(
            self,
            Operation::UseCart | Operation::SelfBorrow | Operation::SelfReturn | Operation::RateLoan
        )
    }
}

const HEAD: &[Role] = &[Role::HeadLibrarian];
const STAFF: &[Role] = &[Role::HeadLibrarian, Role::Librarian];
const STUDENT: &[Role] = &[Role::Student];
const EVERYONE: &[Role] = &[Role::HeadLibrarian, Role::Librarian, Role::Student];

static POLICY: &[(Operation, &[Role])] = &[
    (Operation::ViewCatalog, EVERYONE),
    (Operation::ManageCatalog, STAFF),
    (Operation::ManageStudents, STAFF),
    (Operation::ManageStaff, HEAD),
    (Operation::CreateManualLoan, STAFF),
    (Operation::ManualReturn, STAFF),
    (Operation::ConfirmReturn, STAFF),
    (Operation::ListLoans, STAFF),
    (Operation::ViewReports, STAFF),
    (Operation::UseCart, STUDENT),
    (Operation::SelfBorrow, STUDENT),
    (Operation::SelfReturn, STUDENT),
    (Operation::RateLoan, STUDENT),
    (Operation::ViewOwnLoans, STUDENT),
];

pub fn is_allowed(op: Operation, role: Role) -> bool {
    POLICY
        .iter()
        .find(|(o, _)| *o == op)
        .map(|(_, roles)| roles.contains(&role))
        .unwrap_or(false)
}

/// Operation needed to manage an account of the given role
pub fn manage_account(role: Role) -> Operation {
    if role.is_staff() {
        Operation::ManageStaff
    } else {
        Operation::ManageStudents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Operation; 14] = [
        Operation::ViewCatalog,
        Operation::ManageCatalog,
        Operation::ManageStudents,
        Operation::ManageStaff,
        Operation::CreateManualLoan,
        Operation::ManualReturn,
        Operation::ConfirmReturn,
        Operation::ListLoans,
        Operation::ViewReports,
        Operation::UseCart,
        Operation::SelfBorrow,
        Operation::SelfReturn,
        Operation::RateLoan,
        Operation::ViewOwnLoans,
    ];

    #[test]
    fn test_every_operation_has_a_row() {
        for op in ALL {
            assert!(POLICY.iter().any(|(o, _)| *o == op), "{:?} missing", op);
        }
    }

    #[test]
    fn test_staff_management_is_head_only() {
        assert!(is_allowed(Operation::ManageStaff, Role::HeadLibrarian));
        assert!(!is_allowed(Operation::ManageStaff, Role::Librarian));
        assert!(is_allowed(Operation::ManageStudents, Role::Librarian));
        assert_eq!(manage_account(Role::Librarian), Operation::ManageStaff);
        assert_eq!(manage_account(Role::Student), Operation::ManageStudents);
    }

    #[test]
    fn test_self_service_is_student_only() {
        for op in ALL.iter().filter(|op| op.is_self_service()) {
            assert!(is_allowed(*op, Role::Student));
            assert!(!is_allowed(*op, Role::Librarian));
            assert!(!is_allowed(*op, Role::HeadLibrarian));
        }
        assert!(!is_allowed(Operation::ManualReturn, Role::Student));
        assert!(!is_allowed(Operation::ViewReports, Role::Student));
        assert!(is_allowed(Operation::ViewCatalog, Role::Student));
    }
}
