use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid salary. Please enter a valid number.")]
pub struct InvalidSalary;

/// Parses a salary typed by a user.
/// Accepts surrounding whitespace; rejects empty input, NaN and infinities.
pub fn parse_salary(input: &str) -> Result<f64, InvalidSalary> {
    let salary: f64 = input.trim().parse().map_err(|_| InvalidSalary)?;
    if salary.is_finite() {
        Ok(salary)
    } else {
        Err(InvalidSalary)
    }
}

/// Trims an employee number and rejects blank input.
pub fn normalize_employee_number(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
