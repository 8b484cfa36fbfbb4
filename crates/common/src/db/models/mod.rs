//! SeaORM entity models
//!
//! Database entities for the CoE records service

mod user;
mod record;
mod custom_report;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use record::{
    Entity as RecordEntity,
    Model as RecordRow,
    ActiveModel as RecordActiveModel,
    Column as RecordColumn,
};

pub use custom_report::{
    Entity as CustomReportEntity,
    Model as CustomReport,
    ActiveModel as CustomReportActiveModel,
    Column as CustomReportColumn,
};
