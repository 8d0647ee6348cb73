//! Built-in form schemas and the catalog that resolves forms by id.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::rules::Rule;
use crate::core::schema::{FieldSpec, FormSchema, StepSpec, validate_schemas};

/// Forms available by id. Later registrations replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct FormCatalog {
    forms: BTreeMap<String, FormSchema>,
}

impl FormCatalog {
    /// Catalog holding only the built-in forms.
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        for schema in builtin_forms() {
            catalog.insert(schema);
        }
        catalog
    }

    /// Built-in forms overlaid with `extra`.
    ///
    /// Returns the invariant violations if any schema is malformed.
    pub fn with_overrides(extra: &[FormSchema]) -> Result<Self, Vec<String>> {
        let errors = validate_schemas(extra);
        if !errors.is_empty() {
            return Err(errors);
        }
        let mut catalog = Self::builtin();
        for schema in extra {
            if catalog.forms.contains_key(&schema.id) {
                debug!(form = %schema.id, "config form replaces built-in form");
            }
            catalog.insert(schema.clone());
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, schema: FormSchema) {
        self.forms.insert(schema.id.clone(), schema);
    }

    pub fn get(&self, id: &str) -> Option<&FormSchema> {
        self.forms.get(id)
    }

    /// Forms ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &FormSchema> {
        self.forms.values()
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

/// The registration, validation, login and checkout forms shipped by default.
pub fn builtin_forms() -> Vec<FormSchema> {
    vec![
        lecturer_form(),
        student_form(),
        driver_form(),
        book_form(),
        module_form(),
        validation_form(),
        login_form(),
        checkout_form(),
    ]
}

fn lecturer_form() -> FormSchema {
    FormSchema::single(
        "lecturer",
        "Lecturer Registration",
        vec![
            FieldSpec::new("name", "Name"),
            FieldSpec::new("email", "Email"),
            FieldSpec::new("subject", "Subject"),
            FieldSpec::new("phone", "Phone Number"),
        ],
    )
}

fn student_form() -> FormSchema {
    FormSchema::single(
        "student",
        "Student Registration",
        vec![
            FieldSpec::new("firstName", "First Name"),
            FieldSpec::new("lastName", "Last Name"),
            FieldSpec::new("email", "Email"),
            FieldSpec::new("studentId", "Student ID"),
            FieldSpec::new("dateOfBirth", "Date of Birth"),
        ],
    )
}

fn driver_form() -> FormSchema {
    FormSchema::single(
        "driver",
        "Driver Registration",
        vec![
            FieldSpec::new("name", "Name"),
            FieldSpec::new("licenseNumber", "License Number"),
            FieldSpec::new("phone", "Phone Number"),
            FieldSpec::new("vehicleType", "Vehicle Type").with_rule(Rule::OneOf {
                options: ["Car", "Truck", "Motorcycle"]
                    .map(str::to_string)
                    .to_vec(),
            }),
        ],
    )
}

fn book_form() -> FormSchema {
    FormSchema::single(
        "book",
        "Book Registration",
        vec![
            FieldSpec::new("bookTitle", "Book title"),
            FieldSpec::new("author", "Author name"),
            FieldSpec::new("isbn", "ISBN"),
            FieldSpec::new("publishedYear", "Published year"),
        ],
    )
    .with_success_message("Book registered successfully!")
    .with_submit_failure_message("Failed to register book. Please try again.")
}

fn module_form() -> FormSchema {
    FormSchema::single(
        "module",
        "Module Registration",
        vec![
            FieldSpec::new("moduleName", "Module name"),
            FieldSpec::new("moduleCode", "Module code").uppercase(),
            FieldSpec::new("description", "Description").with_rule(Rule::MinLength {
                min: 10,
                message: Some("Description must be at least 10 characters long".to_string()),
            }),
            FieldSpec::new("credits", "Credits").with_rule(Rule::PositiveInteger { max: Some(20) }),
        ],
    )
    .with_success_message("Module registered successfully!")
}

fn validation_form() -> FormSchema {
    FormSchema::single(
        "validation",
        "Form Validation",
        vec![
            FieldSpec::new("email", "Email"),
            FieldSpec::new("password", "Password"),
            FieldSpec::new("confirmPassword", "Confirm Password").optional(),
        ],
    )
}

fn login_form() -> FormSchema {
    FormSchema::single(
        "login",
        "Login",
        vec![
            FieldSpec::new("username", "Username"),
            FieldSpec::new("password", "Password").with_rule(Rule::MinLength {
                min: 6,
                message: Some("Password must be at least 6 characters".to_string()),
            }),
        ],
    )
    .with_success_message("Login successful!")
    .with_submit_failure_message("Login failed. Please try again.")
}

fn checkout_form() -> FormSchema {
    FormSchema {
        id: "checkout".to_string(),
        title: "Multi-Step Form".to_string(),
        success_message: Some("Form submitted successfully!".to_string()),
        submit_failure_message: None,
        steps: vec![
            StepSpec {
                title: "Personal Information".to_string(),
                fields: vec![
                    FieldSpec::new("firstName", "First name"),
                    FieldSpec::new("lastName", "Last name"),
                    FieldSpec::new("email", "Email"),
                ],
            },
            StepSpec {
                title: "Address".to_string(),
                fields: vec![
                    FieldSpec::new("street", "Street"),
                    FieldSpec::new("city", "City"),
                    FieldSpec::new("state", "State"),
                    FieldSpec::new("zipCode", "ZIP code"),
                ],
            },
            StepSpec {
                title: "Payment".to_string(),
                fields: vec![
                    FieldSpec::new("cardNumber", "Card number"),
                    FieldSpec::new("expiryDate", "Expiry date"),
                    FieldSpec::new("cvv", "CVV"),
                ],
            },
        ],
    }
}
