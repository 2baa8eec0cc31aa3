//! Deterministic demo catalog shared by the CLI and tests.

use homequote_core::domain::catalog::{Requirement, Service};
use homequote_core::domain::session::{BusinessId, ServiceId};

use crate::repositories::InMemoryServiceCatalog;

pub fn demo_business_id() -> BusinessId {
    BusinessId("demo-home-services".to_string())
}

pub fn demo_catalog() -> InMemoryServiceCatalog {
    InMemoryServiceCatalog::new(demo_services())
}

pub fn demo_services() -> Vec<(Service, Vec<Requirement>)> {
    vec![
        (
            service("hvac", "HVAC Services"),
            vec![
                Requirement::required_select(
                    "system_type",
                    "What type of HVAC system do you have?",
                    &["Central Air", "Heat Pump", "Window Unit", "Furnace"],
                ),
                Requirement::required_text(
                    "square_footage",
                    "Roughly how many square feet is the space?",
                ),
                Requirement::required_text("address", "What's the property address?"),
                Requirement::optional_text("urgency", "How soon do you need someone out there?"),
            ],
        ),
        (
            service("plumbing", "Plumbing Repair"),
            vec![
                Requirement::required_text("issue_type", "What's the plumbing issue?"),
                Requirement::required_text("address", "What's the property address?"),
                Requirement::optional_text("urgency", "How soon do you need someone out there?"),
            ],
        ),
        (
            service("kitchen", "Kitchen Remodel"),
            vec![
                Requirement::required_select(
                    "kitchen_size",
                    "How big is the kitchen - small, medium, or large?",
                    &["small", "medium", "large"],
                ),
                Requirement::required_text("budget_range", "What budget range do you have in mind?"),
                Requirement::required_text("address", "What's the property address?"),
                Requirement::optional_text("description", "Anything specific you want in the remodel?"),
            ],
        ),
        (
            service("electrical", "Electrical Work"),
            vec![
                Requirement::required_text("issue_type", "What electrical work do you need?"),
                Requirement::required_text("address", "What's the property address?"),
            ],
        ),
        (
            service("roofing", "Roof Repair"),
            vec![
                Requirement::required_text("issue_type", "What's going on with the roof?"),
                Requirement::required_text("square_footage", "Roughly how large is the roof area in square feet?"),
                Requirement::required_text("address", "What's the property address?"),
            ],
        ),
        (service("lawn", "Lawn Mowing"), vec![
            Requirement::required_text("address", "What's the property address?"),
        ]),
        (
            service("tree", "Tree Removal"),
            vec![
                Requirement::required_text("description", "How many trees, and roughly how tall?"),
                Requirement::required_text("address", "What's the property address?"),
            ],
        ),
    ]
}

fn service(id: &str, name: &str) -> Service {
    Service { id: ServiceId(id.to_string()), name: name.to_string(), description: None }
}
