//! Category registry
//!
//! One static table describing every record category: its storage key, display
//! name, report source type, how the owner reference is stored, and how its
//! documents project into account-report activities. The aggregator, the size
//! estimator and the projector all iterate this table.

use crate::reporting::projection::{DateRule, ProjectionSpec, RoleRule, StatusRule, TitleRule};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a category stores its `createdBy` reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerField {
    /// Bare user id (older categories)
    Reference,
    /// Embedded `{id, name, email}` snapshot (newer categories)
    Snapshot,
    /// No owner at all; records are system-wide
    Absent,
}

/// Record categories, in registry order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Publication,
    Patent,
    Funding,
    FundingProposal,
    Event,
    Achievement,
    Collaboration,
    LocalCollaboration,
    Competition,
    CommercializationProject,
    TrainingsConducted,
    TalkTrainingConference,
    Internship,
    Training,
}

/// Static description of one category
#[derive(Debug)]
pub struct CategoryInfo {
    pub category: Category,
    /// Storage and analytics table key
    pub key: &'static str,
    pub display_name: &'static str,
    /// Name accepted as a custom report `sourceType`, if reports may target it
    pub source_type: Option<&'static str>,
    pub owner_field: OwnerField,
    /// Activity projection; `None` keeps the category out of account reports
    pub projection: Option<ProjectionSpec>,
}

static REGISTRY: [CategoryInfo; 14] = [
    CategoryInfo {
        category: Category::Publication,
        key: "publications",
        display_name: "Publication",
        source_type: Some("Publications"),
        owner_field: OwnerField::Reference,
        projection: Some(ProjectionSpec {
            activity_type: "Publication",
            title: TitleRule::Field("title"),
            date: DateRule::YearStart("year"),
            status: StatusRule::Fixed("Published"),
            role: None,
            summary_fields: &["year", "publicationType", "hecCategory", "journalName"],
            detailed_fields: &["authors", "doi", "impactFactor", "volume", "pages", "link"],
        }),
    },
    CategoryInfo {
        category: Category::Patent,
        key: "patents",
        display_name: "Patent",
        source_type: Some("Patents"),
        owner_field: OwnerField::Reference,
        projection: Some(ProjectionSpec {
            activity_type: "Patent",
            title: TitleRule::Field("title"),
            date: DateRule::Field("filingDate"),
            status: StatusRule::FieldOr("status", "Filed"),
            role: None,
            summary_fields: &["patentNumber", "country"],
            detailed_fields: &["inventors", "grantDate", "description"],
        }),
    },
    CategoryInfo {
        category: Category::Funding,
        key: "fundings",
        display_name: "Funding",
        source_type: Some("Fundings"),
        owner_field: OwnerField::Reference,
        projection: Some(ProjectionSpec {
            activity_type: "Funding",
            title: TitleRule::Field("projectTitle"),
            date: DateRule::Field("startDate"),
            status: StatusRule::FieldOr("status", "Active"),
            role: None,
            summary_fields: &["fundingAgency", "amount"],
            detailed_fields: &["principalInvestigator", "coPrincipalInvestigators", "endDate", "description"],
        }),
    },
    CategoryInfo {
        category: Category::FundingProposal,
        key: "fundingProposals",
        display_name: "Funding Proposal",
        source_type: Some("FundingProposals"),
        owner_field: OwnerField::Reference,
        projection: Some(ProjectionSpec {
            activity_type: "Funding Proposal",
            title: TitleRule::Field("proposalTitle"),
            date: DateRule::Field("submissionDate"),
            status: StatusRule::FieldOr("status", "Submitted"),
            role: None,
            summary_fields: &["fundingAgency", "requestedAmount"],
            detailed_fields: &["principalInvestigator", "duration", "description"],
        }),
    },
    CategoryInfo {
        category: Category::Event,
        key: "events",
        display_name: "Event",
        source_type: Some("Events"),
        owner_field: OwnerField::Reference,
        projection: Some(ProjectionSpec {
            activity_type: "Event",
            title: TitleRule::Field("activity"),
            date: DateRule::Field("date"),
            status: StatusRule::Fixed("Attended"),
            role: Some(RoleRule {
                field: "role",
                other_field: "otherRole",
                other_marker: "other",
            }),
            summary_fields: &["venue"],
            detailed_fields: &["organizer", "description"],
        }),
    },
    CategoryInfo {
        category: Category::Achievement,
        key: "achievements",
        display_name: "Achievement",
        source_type: Some("Achievements"),
        owner_field: OwnerField::Reference,
        projection: Some(ProjectionSpec {
            activity_type: "Achievement",
            title: TitleRule::Field("title"),
            date: DateRule::Field("date"),
            status: StatusRule::Fixed("Achieved"),
            role: None,
            summary_fields: &["awardingBody"],
            detailed_fields: &["category", "description"],
        }),
    },
    CategoryInfo {
        category: Category::Collaboration,
        key: "collaborations",
        display_name: "Collaboration",
        source_type: Some("Collaborations"),
        owner_field: OwnerField::Reference,
        projection: Some(ProjectionSpec {
            activity_type: "Collaboration",
            title: TitleRule::Field("memberOfCoE"),
            date: DateRule::Field("durationStart"),
            status: StatusRule::FieldOr("currentStatus", "Active"),
            role: None,
            summary_fields: &["collaboratingInstitution", "country"],
            detailed_fields: &["durationEnd", "scopeOfCollaboration", "keyOutcomes"],
        }),
    },
    CategoryInfo {
        category: Category::LocalCollaboration,
        key: "localCollaborations",
        display_name: "Local Collaboration",
        source_type: Some("LocalCollaborations"),
        owner_field: OwnerField::Snapshot,
        projection: Some(ProjectionSpec {
            activity_type: "Local Collaboration",
            title: TitleRule::Field("memberOfCoE"),
            date: DateRule::Field("durationStart"),
            status: StatusRule::FieldOr("currentStatus", "Active"),
            role: None,
            summary_fields: &["collaboratingInstitution", "city"],
            detailed_fields: &["durationEnd", "scopeOfCollaboration", "keyOutcomes"],
        }),
    },
    CategoryInfo {
        category: Category::Competition,
        key: "competitions",
        display_name: "Competition",
        source_type: Some("Competitions"),
        owner_field: OwnerField::Snapshot,
        projection: Some(ProjectionSpec {
            activity_type: "Competition",
            title: TitleRule::Field("competitionName"),
            date: DateRule::Field("date"),
            status: StatusRule::FieldOr("result", "Participated"),
            role: None,
            summary_fields: &["organizer"],
            detailed_fields: &["teamMembers", "prizeAmount", "description"],
        }),
    },
    CategoryInfo {
        category: Category::CommercializationProject,
        key: "commercializationProjects",
        display_name: "Commercialization Project",
        source_type: Some("CommercializationProjects"),
        owner_field: OwnerField::Snapshot,
        projection: Some(ProjectionSpec {
            activity_type: "Commercialization Project",
            title: TitleRule::Field("projectTitle"),
            date: DateRule::Field("startDate"),
            status: StatusRule::FieldOr("status", "In Progress"),
            role: None,
            summary_fields: &["industryPartner"],
            detailed_fields: &["estimatedCost", "description"],
        }),
    },
    CategoryInfo {
        category: Category::TrainingsConducted,
        key: "trainingsConducted",
        display_name: "Training Conducted",
        source_type: Some("TrainingsConducted"),
        owner_field: OwnerField::Snapshot,
        projection: Some(ProjectionSpec {
            activity_type: "Training Conducted",
            title: TitleRule::Field("trainingTitle"),
            date: DateRule::Field("startDate"),
            status: StatusRule::Fixed("Conducted"),
            role: None,
            summary_fields: &["venue", "numberOfParticipants"],
            detailed_fields: &["endDate", "targetAudience", "description"],
        }),
    },
    CategoryInfo {
        category: Category::TalkTrainingConference,
        key: "talksTrainingsAttended",
        display_name: "Talk/Training/Conference",
        source_type: Some("TalksTrainingsAttended"),
        owner_field: OwnerField::Snapshot,
        projection: Some(ProjectionSpec {
            activity_type: "Talk/Training/Conference",
            title: TitleRule::Field("title"),
            date: DateRule::Field("date"),
            status: StatusRule::Fixed("Attended"),
            role: None,
            summary_fields: &["mode", "venue"],
            detailed_fields: &["organizer", "duration", "description"],
        }),
    },
    CategoryInfo {
        category: Category::Internship,
        key: "internships",
        display_name: "Internship",
        source_type: Some("Internships"),
        owner_field: OwnerField::Snapshot,
        projection: Some(ProjectionSpec {
            activity_type: "Internship",
            title: TitleRule::Prefixed("Applicant: ", "applicantName"),
            date: DateRule::YearStart("year"),
            status: StatusRule::Fixed("Active"),
            role: None,
            summary_fields: &["university", "year"],
            detailed_fields: &["supervisor", "duration", "projectTitle"],
        }),
    },
    CategoryInfo {
        category: Category::Training,
        key: "trainings",
        display_name: "Training",
        source_type: None,
        owner_field: OwnerField::Absent,
        projection: None,
    },
];

impl Category {
    /// Every category in registry order
    pub const ALL: [Category; 14] = [
        Category::Publication,
        Category::Patent,
        Category::Funding,
        Category::FundingProposal,
        Category::Event,
        Category::Achievement,
        Category::Collaboration,
        Category::LocalCollaboration,
        Category::Competition,
        Category::CommercializationProject,
        Category::TrainingsConducted,
        Category::TalkTrainingConference,
        Category::Internship,
        Category::Training,
    ];

    pub fn info(self) -> &'static CategoryInfo {
        &REGISTRY[self as usize]
    }

    pub fn key(self) -> &'static str {
        self.info().key
    }

    pub fn display_name(self) -> &'static str {
        self.info().display_name
    }

    pub fn owner_field(self) -> OwnerField {
        self.info().owner_field
    }

    /// Records of this category belong to nobody and are visible system-wide
    pub fn is_system_wide(self) -> bool {
        self.owner_field() == OwnerField::Absent
    }

    pub fn projection(self) -> Option<&'static ProjectionSpec> {
        self.info().projection.as_ref()
    }

    /// Look up by storage/table key, e.g. `publications`
    pub fn from_key(key: &str) -> Option<Category> {
        REGISTRY.iter().find(|info| info.key == key).map(|info| info.category)
    }

    /// Look up by custom report source type, e.g. `Publications`
    pub fn from_source_type(name: &str) -> Option<Category> {
        REGISTRY
            .iter()
            .find(|info| info.source_type == Some(name))
            .map(|info| info.category)
    }

    /// Categories that appear in single-account reports
    pub fn projected() -> impl Iterator<Item = (Category, &'static ProjectionSpec)> {
        REGISTRY
            .iter()
            .filter_map(|info| info.projection.as_ref().map(|spec| (info.category, spec)))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
