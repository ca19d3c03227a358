use comfy_table::Table;
use staffdesk_core::Employee;

pub fn employee_table(employees: &[Employee]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Employee No", "Name", "Salary"]);
    for employee in employees {
        table.add_row(vec![
            employee.employee_number.clone(),
            employee.name.clone(),
            format!("{:.2}", employee.salary),
        ]);
    }
    table
}

/// One line per (employee, department) pair, employee columns only on the first.
pub fn department_table(employees: &[Employee]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Employee No", "Name", "Salary", "Department", "Budget"]);
    for employee in employees {
        for (index, department) in employee.departments.iter().enumerate() {
            let (number, name, salary) = if index == 0 {
                (
                    employee.employee_number.clone(),
                    employee.name.clone(),
                    format!("{:.2}", employee.salary),
                )
            } else {
                (String::new(), String::new(), String::new())
            };
            table.add_row(vec![
                number,
                name,
                salary,
                department.name.clone(),
                format!("{:.2}", department.budget),
            ]);
        }
    }
    table
}

/// The three-line summary printed after the default promotion.
/// Salaries use Rust's shortest round-trip form with a trailing `.0` for
/// whole numbers; exponent notation only kicks in from 1e16.
pub fn employee_summary(employee: &Employee) -> String {
    format!(
        "Employee number: {}\nName: {}\nSalary: {:?}",
        employee.employee_number, employee.name, employee.salary
    )
}
