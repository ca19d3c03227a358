#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    pub employee_number: String,
    pub name: String,
    pub salary: f64,
    /// Only filled by the joined department listing; never written back.
    pub departments: Vec<Department>,
}

impl Employee {
    pub fn new(employee_number: impl Into<String>, name: impl Into<String>, salary: f64) -> Self {
        Self {
            employee_number: employee_number.into(),
            name: name.into(),
            salary,
            departments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Department {
    pub name: String,
    pub budget: f64,
}

impl Department {
    pub fn new(name: impl Into<String>, budget: f64) -> Self {
        Self {
            name: name.into(),
            budget,
        }
    }
}
