//! Bodies of the employee procedures.
//!
//! SQLite has no stored procedures, so each one is kept here as a single
//! parameterized statement. Placeholders are positional and follow the
//! parameter order of the procedure.

use staffdesk_core::Procedure;

pub fn procedure_sql(procedure: Procedure) -> &'static str {
    match procedure {
        Procedure::GetAllEmployees => "SELECT EmpNo, EmpName, EmpSalary FROM Employee",
        Procedure::GetEmployeeByEmpNo => {
            "SELECT EmpNo, EmpName, EmpSalary FROM Employee WHERE EmpNo = ?1"
        }
        Procedure::InsertEmployee => {
            "INSERT INTO Employee (EmpNo, EmpName, EmpSalary) VALUES (?1, ?2, ?3)"
        }
        Procedure::UpdateEmployee => {
            "UPDATE Employee SET EmpName = ?2, EmpSalary = ?3 WHERE EmpNo = ?1"
        }
        Procedure::DeleteEmployee => "DELETE FROM Employee WHERE EmpNo = ?1",
        Procedure::GetAllEmployeesWithDepartments => {
            r#"
            SELECT
                e.EmpNo,
                e.EmpName,
                e.EmpSalary,
                d.DeptName,
                d.DeptBudget
            FROM Employee e
            JOIN EmployeeDepartment ed ON ed.EmpNo = e.EmpNo
            JOIN Department d ON d.DeptNo = ed.DeptNo
            ORDER BY e.EmpNo, d.DeptName
            "#
        }
    }
}
