use std::collections::HashMap;

use tracing::{debug, warn};

use crate::domain::{Department, Employee};
use crate::error::{GatewayError, StoreError};
use crate::ports::{ConnectionProvider, Procedure, Row, SqlValue};

const EMP_NO: &str = "EmpNo";
const EMP_NAME: &str = "EmpName";
const EMP_SALARY: &str = "EmpSalary";
const DEPT_NAME: &str = "DeptName";
const DEPT_BUDGET: &str = "DeptBudget";

/// Maps employee operations onto server-side procedure calls.
///
/// Every operation acquires one connection from the provider, makes exactly
/// one procedure call and drops the connection before returning, whether the
/// call succeeded or not. No state is shared between calls.
pub struct EmployeeGateway {
    provider: Box<dyn ConnectionProvider>,
}

impl EmployeeGateway {
    /// Creates a new EmployeeGateway over the given connection provider
    pub fn new(provider: Box<dyn ConnectionProvider>) -> Self {
        Self { provider }
    }

    /// Lists every employee in the order the store returns them.
    pub fn fetch_all(&self) -> Result<Vec<Employee>, GatewayError> {
        self.query(Procedure::GetAllEmployees, &[])
            .and_then(|rows| rows.iter().map(map_employee).collect())
            .map_err(|source| failed("Error fetching all employees.", source))
    }

    /// Looks up one employee. `Ok(None)` means no such employee number.
    pub fn fetch_by_number(&self, employee_number: &str) -> Result<Option<Employee>, GatewayError> {
        self.query(Procedure::GetEmployeeByEmpNo, &[employee_number.into()])
            .and_then(|rows| rows.first().map(map_employee).transpose())
            .map_err(|source| {
                failed(
                    format!("Error fetching employee with employee number: {employee_number}"),
                    source,
                )
            })
    }

    /// Inserts a new employee.
    ///
    /// Fails with [`GatewayError::DuplicateKey`] when the employee number is
    /// already taken.
    pub fn save(&self, employee: &Employee) -> Result<(), GatewayError> {
        match self.execute(Procedure::InsertEmployee, &employee_params(employee)) {
            Ok(_) => Ok(()),
            Err(source) if source.is_unique_violation() => {
                warn!(employee_number = %employee.employee_number, "duplicate employee number");
                Err(GatewayError::DuplicateKey {
                    employee_number: employee.employee_number.clone(),
                    source,
                })
            }
            Err(source) => Err(failed(
                format!("Error saving employee: {}", employee.employee_number),
                source,
            )),
        }
    }

    /// Overwrites name and salary of the employee with the same number.
    /// Updating an unknown number is not an error.
    pub fn update(&self, employee: &Employee) -> Result<(), GatewayError> {
        let affected = self
            .execute(Procedure::UpdateEmployee, &employee_params(employee))
            .map_err(|source| {
                failed(
                    format!("Error updating employee: {}", employee.employee_number),
                    source,
                )
            })?;
        if affected == 0 {
            debug!(employee_number = %employee.employee_number, "update matched no employee");
        }
        Ok(())
    }

    pub fn delete_by_number(&self, employee_number: &str) -> Result<(), GatewayError> {
        self.execute(Procedure::DeleteEmployee, &[employee_number.into()])
            .map(|_| ())
            .map_err(|source| {
                failed(
                    format!("Error deleting employee with employee number: {employee_number}"),
                    source,
                )
            })
    }

    /// Lists employees together with the departments they belong to.
    ///
    /// The store returns one row per (employee, department) pair; rows are
    /// folded into one employee per number, in first-seen order. Employees
    /// without any department row do not appear.
    pub fn fetch_all_with_departments(&self) -> Result<Vec<Employee>, GatewayError> {
        self.query(Procedure::GetAllEmployeesWithDepartments, &[])
            .and_then(|rows| group_by_employee(&rows))
            .map_err(|source| failed("Error fetching employees and their departments.", source))
    }

    fn query(&self, procedure: Procedure, params: &[SqlValue]) -> Result<Vec<Row>, StoreError> {
        debug!(%procedure, "calling procedure");
        let mut connection = self.provider.acquire()?;
        let rows = connection.query(procedure, params)?;
        debug!(%procedure, rows = rows.len(), "procedure returned rows");
        Ok(rows)
    }

    fn execute(&self, procedure: Procedure, params: &[SqlValue]) -> Result<usize, StoreError> {
        debug!(%procedure, "calling procedure");
        let mut connection = self.provider.acquire()?;
        let affected = connection.execute(procedure, params)?;
        debug!(%procedure, affected, "procedure completed");
        Ok(affected)
    }
}

fn failed(operation: impl Into<String>, source: StoreError) -> GatewayError {
    let operation: String = operation.into();
    warn!(error = %source, "{operation}");
    GatewayError::persistence(operation, source)
}

fn employee_params(employee: &Employee) -> [SqlValue; 3] {
    [
        employee.employee_number.as_str().into(),
        employee.name.as_str().into(),
        employee.salary.into(),
    ]
}

fn map_employee(row: &Row) -> Result<Employee, StoreError> {
    Ok(Employee::new(
        row.text(EMP_NO)?,
        row.text(EMP_NAME)?,
        row.real(EMP_SALARY)?,
    ))
}

pub(crate) fn group_by_employee(rows: &[Row]) -> Result<Vec<Employee>, StoreError> {
    let mut employees: Vec<Employee> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let employee_number = row.text(EMP_NO)?;
        let index = match positions.get(&employee_number) {
            Some(&index) => index,
            None => {
                employees.push(map_employee(row)?);
                positions.insert(employee_number, employees.len() - 1);
                employees.len() - 1
            }
        };
        employees[index]
            .departments
            .push(Department::new(row.text(DEPT_NAME)?, row.real(DEPT_BUDGET)?));
    }

    Ok(employees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreErrorKind;
    use crate::ports::StoreConnection;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct FakeState {
        employees: Vec<Employee>,
        // (employee number, department) in join-row order
        memberships: Vec<(String, Department)>,
        fail_on: Option<Procedure>,
        fail_acquire: bool,
        live: usize,
        acquired: usize,
        calls: Vec<(Procedure, Vec<SqlValue>)>,
    }

    struct FakeProvider {
        state: Rc<RefCell<FakeState>>,
    }

    struct FakeConnection {
        state: Rc<RefCell<FakeState>>,
    }

    impl ConnectionProvider for FakeProvider {
        fn acquire(&self) -> Result<Box<dyn StoreConnection + '_>, StoreError> {
            let mut state = self.state.borrow_mut();
            if state.fail_acquire {
                return Err(StoreError::new(StoreErrorKind::Connection, "connection refused"));
            }
            state.live += 1;
            state.acquired += 1;
            Ok(Box::new(FakeConnection {
                state: Rc::clone(&self.state),
            }))
        }
    }

    impl Drop for FakeConnection {
        fn drop(&mut self) {
            self.state.borrow_mut().live -= 1;
        }
    }

    fn text(value: &SqlValue) -> String {
        match value {
            SqlValue::Text(value) => value.clone(),
            other => panic!("expected text, got {other:?}"),
        }
    }

    fn real(value: &SqlValue) -> f64 {
        match value {
            SqlValue::Real(value) => *value,
            other => panic!("expected real, got {other:?}"),
        }
    }

    fn employee_row(employee: &Employee) -> Row {
        Row::new()
            .with(EMP_NO, employee.employee_number.as_str())
            .with(EMP_NAME, employee.name.as_str())
            .with(EMP_SALARY, employee.salary)
    }

    impl StoreConnection for FakeConnection {
        fn query(&mut self, procedure: Procedure, params: &[SqlValue]) -> Result<Vec<Row>, StoreError> {
            let mut state = self.state.borrow_mut();
            state.calls.push((procedure, params.to_vec()));
            if state.fail_on == Some(procedure) {
                return Err(StoreError::new(StoreErrorKind::Query, "simulated failure"));
            }
            let rows = match procedure {
                Procedure::GetAllEmployees => state.employees.iter().map(employee_row).collect(),
                Procedure::GetEmployeeByEmpNo => {
                    let number = text(&params[0]);
                    state
                        .employees
                        .iter()
                        .filter(|e| e.employee_number == number)
                        .map(employee_row)
                        .collect()
                }
                Procedure::GetAllEmployeesWithDepartments => state
                    .memberships
                    .iter()
                    .filter_map(|(number, department)| {
                        let employee = state.employees.iter().find(|e| &e.employee_number == number)?;
                        Some(
                            employee_row(employee)
                                .with(DEPT_NAME, department.name.as_str())
                                .with(DEPT_BUDGET, department.budget),
                        )
                    })
                    .collect(),
                other => panic!("{other} does not return rows"),
            };
            Ok(rows)
        }

        fn execute(&mut self, procedure: Procedure, params: &[SqlValue]) -> Result<usize, StoreError> {
            let mut state = self.state.borrow_mut();
            state.calls.push((procedure, params.to_vec()));
            if state.fail_on == Some(procedure) {
                return Err(StoreError::new(StoreErrorKind::Query, "simulated failure"));
            }
            let number = text(&params[0]);
            match procedure {
                Procedure::InsertEmployee => {
                    if state.employees.iter().any(|e| e.employee_number == number) {
                        return Err(StoreError::new(
                            StoreErrorKind::UniqueViolation,
                            "primary key violation",
                        ));
                    }
                    let employee = Employee::new(number, text(&params[1]), real(&params[2]));
                    state.employees.push(employee);
                    Ok(1)
                }
                Procedure::UpdateEmployee => {
                    let mut affected = 0;
                    for employee in state.employees.iter_mut().filter(|e| e.employee_number == number) {
                        employee.name = text(&params[1]);
                        employee.salary = real(&params[2]);
                        affected += 1;
                    }
                    Ok(affected)
                }
                Procedure::DeleteEmployee => {
                    let before = state.employees.len();
                    state.employees.retain(|e| e.employee_number != number);
                    Ok(before - state.employees.len())
                }
                other => panic!("{other} returns rows"),
            }
        }
    }

    fn gateway() -> (EmployeeGateway, Rc<RefCell<FakeState>>) {
        let state = Rc::new(RefCell::new(FakeState::default()));
        let provider = FakeProvider {
            state: Rc::clone(&state),
        };
        (EmployeeGateway::new(Box::new(provider)), state)
    }

    #[test]
    fn test_fetch_all_empty_is_ok() {
        let (gateway, _) = gateway();
        assert!(gateway.fetch_all().unwrap().is_empty());
    }

    #[test]
    fn test_fetch_all_keeps_store_order() {
        let (gateway, state) = gateway();
        state.borrow_mut().employees = vec![
            Employee::new("E9", "Zed", 1.0),
            Employee::new("E1", "Ann", 2.0),
        ];
        let numbers: Vec<_> = gateway
            .fetch_all()
            .unwrap()
            .into_iter()
            .map(|e| e.employee_number)
            .collect();
        assert_eq!(numbers, vec!["E9", "E1"]);
    }

    #[test]
    fn test_fetch_missing_employee_returns_none() {
        let (gateway, _) = gateway();
        assert!(gateway.fetch_by_number("E404").unwrap().is_none());
    }

    #[test]
    fn test_save_then_fetch_round_trip() {
        let (gateway, _) = gateway();
        gateway.save(&Employee::new("E1", "Ann", 50000.0)).unwrap();
        let found = gateway.fetch_by_number("E1").unwrap().unwrap();
        assert_eq!(found, Employee::new("E1", "Ann", 50000.0));
    }

    #[test]
    fn test_save_binds_parameters_in_order() {
        let (gateway, state) = gateway();
        gateway.save(&Employee::new("E1", "Ann", 50000.0)).unwrap();
        let state = state.borrow();
        let (procedure, params) = &state.calls[0];
        assert_eq!(*procedure, Procedure::InsertEmployee);
        assert_eq!(
            params,
            &vec![
                SqlValue::Text("E1".into()),
                SqlValue::Text("Ann".into()),
                SqlValue::Real(50000.0)
            ]
        );
    }

    #[test]
    fn test_save_duplicate_is_duplicate_key() {
        let (gateway, _) = gateway();
        gateway.save(&Employee::new("E1", "Ann", 50000.0)).unwrap();
        let err = gateway.save(&Employee::new("E1", "Other", 1.0)).unwrap_err();
        match err {
            GatewayError::DuplicateKey { employee_number, source } => {
                assert_eq!(employee_number, "E1");
                assert!(source.is_unique_violation());
            }
            other => panic!("expected DuplicateKey, got {other:?}"),
        }
    }

    #[test]
    fn test_save_other_failure_is_persistence() {
        let (gateway, state) = gateway();
        state.borrow_mut().fail_on = Some(Procedure::InsertEmployee);
        let err = gateway.save(&Employee::new("E1", "Ann", 1.0)).unwrap_err();
        assert!(matches!(err, GatewayError::Persistence { .. }));
        assert_eq!(err.to_string(), "Error saving employee: E1");
    }

    #[test]
    fn test_update_changes_name_and_salary() {
        let (gateway, _) = gateway();
        gateway.save(&Employee::new("E1", "Ann", 50000.0)).unwrap();
        gateway.update(&Employee::new("E1", "Annie", 55000.0)).unwrap();
        let found = gateway.fetch_by_number("E1").unwrap().unwrap();
        assert_eq!(found.employee_number, "E1");
        assert_eq!(found.name, "Annie");
        assert_eq!(found.salary, 55000.0);
    }

    #[test]
    fn test_update_unknown_employee_is_ok() {
        let (gateway, state) = gateway();
        gateway.update(&Employee::new("E404", "Ghost", 1.0)).unwrap();
        assert!(state.borrow().employees.is_empty());
    }

    #[test]
    fn test_delete_then_fetch_returns_none() {
        let (gateway, _) = gateway();
        gateway.save(&Employee::new("E1", "Ann", 50000.0)).unwrap();
        gateway.delete_by_number("E1").unwrap();
        assert!(gateway.fetch_by_number("E1").unwrap().is_none());
    }

    #[test]
    fn test_failure_messages_name_operation_and_key() {
        let (gateway, state) = gateway();
        for procedure in Procedure::ALL {
            state.borrow_mut().fail_on = Some(procedure);
            let employee = Employee::new("E7", "Sam", 1.0);
            let err = match procedure {
                Procedure::GetAllEmployees => gateway.fetch_all().unwrap_err(),
                Procedure::GetEmployeeByEmpNo => gateway.fetch_by_number("E7").unwrap_err(),
                Procedure::InsertEmployee => gateway.save(&employee).unwrap_err(),
                Procedure::UpdateEmployee => gateway.update(&employee).unwrap_err(),
                Procedure::DeleteEmployee => gateway.delete_by_number("E7").unwrap_err(),
                Procedure::GetAllEmployeesWithDepartments => {
                    gateway.fetch_all_with_departments().unwrap_err()
                }
            };
            let message = err.to_string();
            match procedure {
                Procedure::GetAllEmployees => assert_eq!(message, "Error fetching all employees."),
                Procedure::GetAllEmployeesWithDepartments => {
                    assert_eq!(message, "Error fetching employees and their departments.")
                }
                _ => assert!(message.ends_with("E7"), "{message}"),
            }
        }
    }

    #[test]
    fn test_connection_released_on_every_path() {
        let (gateway, state) = gateway();
        gateway.save(&Employee::new("E1", "Ann", 1.0)).unwrap();
        gateway.fetch_by_number("E404").unwrap();
        gateway.save(&Employee::new("E1", "Ann", 1.0)).unwrap_err();
        state.borrow_mut().fail_on = Some(Procedure::GetAllEmployees);
        gateway.fetch_all().unwrap_err();

        let state = state.borrow();
        assert_eq!(state.live, 0);
        assert_eq!(state.acquired, 4);
    }

    #[test]
    fn test_acquire_failure_is_persistence() {
        let (gateway, state) = gateway();
        state.borrow_mut().fail_acquire = true;
        let err = gateway.fetch_all().unwrap_err();
        match err {
            GatewayError::Persistence { source, .. } => {
                assert_eq!(source.kind(), StoreErrorKind::Connection)
            }
            other => panic!("expected Persistence, got {other:?}"),
        }
    }

    #[test]
    fn test_fetch_with_departments_groups_rows() {
        let (gateway, state) = gateway();
        {
            let mut state = state.borrow_mut();
            state.employees = vec![
                Employee::new("E1", "Ann", 1.0),
                Employee::new("E2", "Bo", 2.0),
                Employee::new("E3", "Cy", 3.0),
            ];
            state.memberships = vec![
                ("E2".into(), Department::new("Sales", 100.0)),
                ("E1".into(), Department::new("HR", 50.0)),
                ("E2".into(), Department::new("IT", 300.0)),
                ("E2".into(), Department::new("Legal", 10.0)),
            ];
        }

        let employees = gateway.fetch_all_with_departments().unwrap();
        assert_eq!(employees.len(), 2);
        assert_eq!(employees[0].employee_number, "E2");
        assert_eq!(employees[0].departments.len(), 3);
        assert_eq!(employees[0].departments[1], Department::new("IT", 300.0));
        assert_eq!(employees[1].employee_number, "E1");
        assert_eq!(employees[1].departments, vec![Department::new("HR", 50.0)]);
        // E3 has no department rows
        assert!(employees.iter().all(|e| e.employee_number != "E3"));
    }

    #[test]
    fn test_group_by_employee_rejects_malformed_row() {
        let rows = vec![Row::new().with(EMP_NO, "E1").with(EMP_NAME, "Ann")];
        let err = group_by_employee(&rows).unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::Decode);
    }

    #[test]
    fn test_employee_scenario() {
        let (gateway, _) = gateway();
        gateway.save(&Employee::new("E100", "Ann", 50000.0)).unwrap();
        assert!(gateway
            .fetch_all()
            .unwrap()
            .iter()
            .any(|e| e.employee_number == "E100"));

        gateway.update(&Employee::new("E100", "Ann", 55000.0)).unwrap();
        let found = gateway.fetch_by_number("E100").unwrap().unwrap();
        assert_eq!(found.salary, 55000.0);

        gateway.delete_by_number("E100").unwrap();
        assert!(gateway.fetch_by_number("E100").unwrap().is_none());
    }
}
