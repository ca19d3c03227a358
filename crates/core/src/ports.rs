use crate::error::{StoreError, StoreErrorKind};

/// The server-side procedures the gateway knows how to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Procedure {
    GetAllEmployees,
    GetEmployeeByEmpNo,
    InsertEmployee,
    UpdateEmployee,
    DeleteEmployee,
    GetAllEmployeesWithDepartments,
}

impl Procedure {
    pub const ALL: [Procedure; 6] = [
        Procedure::GetAllEmployees,
        Procedure::GetEmployeeByEmpNo,
        Procedure::InsertEmployee,
        Procedure::UpdateEmployee,
        Procedure::DeleteEmployee,
        Procedure::GetAllEmployeesWithDepartments,
    ];

    /// Name of the procedure in the backing store.
    pub fn name(self) -> &'static str {
        match self {
            Procedure::GetAllEmployees => "uspGetAllEmployees",
            Procedure::GetEmployeeByEmpNo => "uspGetEmployeeByEmpNo",
            Procedure::InsertEmployee => "uspInsertEmployee",
            Procedure::UpdateEmployee => "uspUpdateEmployee",
            Procedure::DeleteEmployee => "uspDeleteEmployee",
            Procedure::GetAllEmployeesWithDepartments => "uspGetAllEmployeesWithDepartments",
        }
    }

    /// Number of positional parameters the procedure takes.
    pub fn arity(self) -> usize {
        match self {
            Procedure::GetAllEmployees | Procedure::GetAllEmployeesWithDepartments => 0,
            Procedure::GetEmployeeByEmpNo | Procedure::DeleteEmployee => 1,
            Procedure::InsertEmployee | Procedure::UpdateEmployee => 3,
        }
    }
}

impl std::fmt::Display for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A positional parameter or a result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

/// One result row, cells addressed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.cells.push((column.into(), value.into()));
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.cells
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    pub fn text(&self, column: &str) -> Result<String, StoreError> {
        match self.get(column) {
            Some(SqlValue::Text(value)) => Ok(value.clone()),
            Some(other) => Err(decode_error(column, "text", other)),
            None => Err(missing_column(column)),
        }
    }

    /// Reads a floating-point cell; integral cells are widened.
    pub fn real(&self, column: &str) -> Result<f64, StoreError> {
        match self.get(column) {
            Some(SqlValue::Real(value)) => Ok(*value),
            Some(SqlValue::Integer(value)) => Ok(*value as f64),
            Some(other) => Err(decode_error(column, "real", other)),
            None => Err(missing_column(column)),
        }
    }
}

fn missing_column(column: &str) -> StoreError {
    StoreError::new(
        StoreErrorKind::Decode,
        format!("column {column} missing from result row"),
    )
}

fn decode_error(column: &str, expected: &str, found: &SqlValue) -> StoreError {
    StoreError::new(
        StoreErrorKind::Decode,
        format!("column {column}: expected {expected}, found {found:?}"),
    )
}

/// A live handle to the backing store. Dropping it releases the connection.
pub trait StoreConnection {
    /// Calls a procedure that returns rows.
    fn query(&mut self, procedure: Procedure, params: &[SqlValue]) -> Result<Vec<Row>, StoreError>;

    /// Calls a procedure that returns no rows; yields the affected row count.
    fn execute(&mut self, procedure: Procedure, params: &[SqlValue]) -> Result<usize, StoreError>;
}

/// Hands out one connection per gateway operation.
pub trait ConnectionProvider {
    fn acquire(&self) -> Result<Box<dyn StoreConnection + '_>, StoreError>;
}
