use crate::xml_mapper::{number, truthy, FieldRule, Mapped, Mapping, Record};
use serde::Serialize;

// Rule tables for the vendor elements

pub static CATEGORY_MAPPING: Mapping = Mapping {
    selector: "//Category",
    fields: &[FieldRule::text("code", "Code"), FieldRule::text("name", "Name")],
};

pub static JOB_SEARCH_RESULT_MAPPING: Mapping = Mapping {
    selector: "//JobSearchResult",
    fields: &[
        FieldRule::text("id", "DID"),
        FieldRule::text("title", "JobTitle"),
        FieldRule::text("description", "DescriptionTeaser"),
        FieldRule::text("company", "Company"),
        FieldRule::text("location", "Location"),
        FieldRule::text("pay", "Pay"),
    ],
};

pub static MONEY_MAPPING: Mapping = Mapping {
    selector: "//Money",
    fields: &[
        FieldRule::text("amount", "Amount"),
        FieldRule::text("currency", "CurrencyCode"),
        FieldRule::text("display_amount", "FormattedAmount"),
    ],
};

pub static JOB_MAPPING: Mapping = Mapping {
    selector: "//Job",
    fields: &[
        FieldRule::text("apply_url", "ApplyURL"),
        FieldRule::text("external_application", "ExternalApplication"),
        FieldRule::text("service_url", "ApplicationSubmitServiceURL"),
        FieldRule::text("begin_date", "BeginDate"),
        FieldRule::text("blank_application_url", "BlankApplicationServiceURL"),
        FieldRule::text("categories", "Categories"),
        FieldRule::text("company", "Company"),
        FieldRule::text("company_url", "CompanyDetailsURL"),
        FieldRule::text("company_id", "CompanyDID"),
        FieldRule::text("company_search_url", "CompanyJobSearchURL"),
        FieldRule::text("company_image_url", "CompanyImageURL"),
        FieldRule::text("contact_email_url", "ContactInfoEmailURL"),
        FieldRule::text("contact_fax", "ContactInfoFax"),
        FieldRule::text("contact_name", "ContactInfoName"),
        FieldRule::text("contact_phone", "ContactInfoPhone"),
        FieldRule::text("degree_required", "DegreeRequired"),
        FieldRule::text("id", "DID"),
        FieldRule::text("display_id", "DisplayJobID"),
        FieldRule::text("employment_type", "EmploymentType"),
        FieldRule::text("end_date", "EndDate"),
        FieldRule::text("experience_required", "ExperienceRequired"),
        FieldRule::text("description", "JobDescription"),
        FieldRule::text("requirements", "JobRequirements"),
        FieldRule::text("title", "JobTitle"),
        FieldRule::text("street1", "LocationStreet1"),
        FieldRule::text("street2", "LocationStreet2"),
        FieldRule::text("city", "LocationCity"),
        FieldRule::text("country", "LocationCountry"),
        FieldRule::text("short_location", "LocationFormatted"),
        FieldRule::text("latitude", "LocationLatitude"),
        FieldRule::text("longitude", "LocationLongitude"),
        FieldRule::text("metro", "LocationMetroCity"),
        FieldRule::text("postal_code", "LocationPostalCode"),
        FieldRule::text("state", "LocationState"),
        FieldRule::text("manager", "ManagesOther"),
        FieldRule::text("modified_date", "ModifiedDate"),
        FieldRule::single("pay_high", "PayHigh", &MONEY_MAPPING),
        FieldRule::single("pay_low", "PayLow", &MONEY_MAPPING),
        FieldRule::text("pay_period", "PayPer"),
        FieldRule::text("pay_range", "PayHighLowFormatted"),
        FieldRule::single("commission", "PayCommission", &MONEY_MAPPING),
        FieldRule::single("bonus", "PayBonus", &MONEY_MAPPING),
        FieldRule::text("other_pay", "PayOther"),
        FieldRule::text("print_url", "PrinterFriendlyURL"),
        FieldRule::text("relocation_covered", "RelocationCovered"),
        FieldRule::text("travel_required", "TravelRequired"),
    ],
};

pub static ANSWER_MAPPING: Mapping = Mapping {
    selector: "//Answer",
    fields: &[
        FieldRule::text("question_id", "QuestionID"),
        FieldRule::text("id", "AnswerID"),
        FieldRule::text("text", "AnswerText"),
    ],
};

pub static QUESTION_MAPPING: Mapping = Mapping {
    selector: "//Question",
    fields: &[
        FieldRule::text("id", "QuestionID"),
        FieldRule::text("question_type", "QuestionType"),
        FieldRule::text("required", "IsRequired"),
        FieldRule::text("format", "ExpectedResponseFormat"),
        FieldRule::text("text", "QuestionText"),
        FieldRule::list("answers", "Answers", &ANSWER_MAPPING),
    ],
};

pub static BLANK_APPLICATION_MAPPING: Mapping = Mapping {
    selector: "//BlankApplication",
    fields: &[
        FieldRule::text("apply_url", "ApplyURL"),
        FieldRule::text("service_url", "ApplicationSubmitServiceURL"),
        FieldRule::text("job_id", "JobDID"),
        FieldRule::text("job_title", "JobTitle"),
        FieldRule::text("total_questions", "TotalQuestions"),
        FieldRule::text("total_required_questions", "TotalRequiredQuestions"),
        FieldRule::list("questions", "Questions", &QUESTION_MAPPING),
    ],
};

pub static ERROR_MAPPING: Mapping = Mapping {
    selector: "//Error",
    fields: &[FieldRule::text("message", ".")],
};

pub static RESPONSE_APPLICATION_MAPPING: Mapping = Mapping {
    selector: "//ResponseApplication",
    fields: &[
        FieldRule::text("status", "ApplicationStatus"),
        FieldRule::list("errors", "Errors", &ERROR_MAPPING),
    ],
};

/// Anything that identifies a job: a bare DID or a record carrying one.
pub trait JobId {
    fn job_id(&self) -> &str;
}

impl JobId for str {
    fn job_id(&self) -> &str {
        self
    }
}

impl JobId for String {
    fn job_id(&self) -> &str {
        self
    }
}

/// Anything that identifies a category: a bare code or a `Category`.
pub trait CategoryCode {
    fn category_code(&self) -> &str;
}

impl CategoryCode for str {
    fn category_code(&self) -> &str {
        self
    }
}

impl CategoryCode for String {
    fn category_code(&self) -> &str {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Category {
    pub code: Option<String>,
    pub name: Option<String>,
}

impl Mapped for Category {
    fn mapping() -> &'static Mapping {
        &CATEGORY_MAPPING
    }

    fn from_record(record: &Record) -> Self {
        Self {
            code: record.text("code"),
            name: record.text("name"),
        }
    }
}

impl CategoryCode for Category {
    fn category_code(&self) -> &str {
        self.code.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct JobSearchResult {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub pay: Option<String>,
    /// Category codes. The search endpoint never reports them, so the client
    /// fills them in from the category that was searched.
    pub categories: Vec<String>,
}

impl Mapped for JobSearchResult {
    fn mapping() -> &'static Mapping {
        &JOB_SEARCH_RESULT_MAPPING
    }

    fn from_record(record: &Record) -> Self {
        Self {
            id: record.text("id"),
            title: record.text("title"),
            description: record.text("description"),
            company: record.text("company"),
            location: record.text("location"),
            pay: record.text("pay"),
            categories: Vec::new(),
        }
    }
}

impl JobId for JobSearchResult {
    fn job_id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Money {
    pub amount: f64,
    pub currency: Option<String>,
    pub display_amount: Option<String>,
}

impl Mapped for Money {
    fn mapping() -> &'static Mapping {
        &MONEY_MAPPING
    }

    fn from_record(record: &Record) -> Self {
        Self {
            amount: number(record.text("amount").as_deref()),
            currency: record.text("currency"),
            display_amount: record.text("display_amount"),
        }
    }
}

fn money(record: &Record, name: &str) -> Option<Money> {
    record.single(name).map(Money::from_record)
}

/// Full job detail from the `/job` endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Job {
    pub id: Option<String>,
    pub display_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub categories: Vec<String>,
    pub apply_url: Option<String>,
    pub external_application: Option<String>,
    pub service_url: Option<String>,
    pub blank_application_url: Option<String>,
    pub print_url: Option<String>,
    pub begin_date: Option<String>,
    pub end_date: Option<String>,
    pub modified_date: Option<String>,
    pub company: Option<String>,
    pub company_id: Option<String>,
    pub company_url: Option<String>,
    pub company_search_url: Option<String>,
    pub company_image_url: Option<String>,
    pub contact_email_url: Option<String>,
    pub contact_fax: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub degree_required: Option<String>,
    pub employment_type: Option<String>,
    pub experience_required: Option<String>,
    pub street1: Option<String>,
    pub street2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub short_location: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub metro: Option<String>,
    pub manager: Option<String>,
    pub pay_high: Option<Money>,
    pub pay_low: Option<Money>,
    pub pay_period: Option<String>,
    pub pay_range: Option<String>,
    pub commission: Option<Money>,
    pub bonus: Option<Money>,
    pub other_pay: Option<String>,
    pub relocation_covered: Option<String>,
    pub travel_required: Option<String>,
}

impl Job {
    /// Address parts joined with ", ", skipping absent or blank ones.
    pub fn location(&self) -> String {
        [
            &self.street1,
            &self.street2,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.country,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }

    pub fn is_external_application(&self) -> bool {
        truthy(self.external_application.as_deref())
    }

    pub fn is_manager(&self) -> bool {
        truthy(self.manager.as_deref())
    }

    pub fn is_relocation_covered(&self) -> bool {
        truthy(self.relocation_covered.as_deref())
    }
}

fn split_categories(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

impl Mapped for Job {
    fn mapping() -> &'static Mapping {
        &JOB_MAPPING
    }

    fn from_record(record: &Record) -> Self {
        Self {
            id: record.text("id"),
            display_id: record.text("display_id"),
            title: record.text("title"),
            description: record.text("description"),
            requirements: record.text("requirements"),
            categories: split_categories(record.text("categories")),
            apply_url: record.text("apply_url"),
            external_application: record.text("external_application"),
            service_url: record.text("service_url"),
            blank_application_url: record.text("blank_application_url"),
            print_url: record.text("print_url"),
            begin_date: record.text("begin_date"),
            end_date: record.text("end_date"),
            modified_date: record.text("modified_date"),
            company: record.text("company"),
            company_id: record.text("company_id"),
            company_url: record.text("company_url"),
            company_search_url: record.text("company_search_url"),
            company_image_url: record.text("company_image_url"),
            contact_email_url: record.text("contact_email_url"),
            contact_fax: record.text("contact_fax"),
            contact_name: record.text("contact_name"),
            contact_phone: record.text("contact_phone"),
            degree_required: record.text("degree_required"),
            employment_type: record.text("employment_type"),
            experience_required: record.text("experience_required"),
            street1: record.text("street1"),
            street2: record.text("street2"),
            city: record.text("city"),
            state: record.text("state"),
            postal_code: record.text("postal_code"),
            country: record.text("country"),
            short_location: record.text("short_location"),
            latitude: record.text("latitude"),
            longitude: record.text("longitude"),
            metro: record.text("metro"),
            manager: record.text("manager"),
            pay_high: money(record, "pay_high"),
            pay_low: money(record, "pay_low"),
            pay_period: record.text("pay_period"),
            pay_range: record.text("pay_range"),
            commission: money(record, "commission"),
            bonus: money(record, "bonus"),
            other_pay: record.text("other_pay"),
            relocation_covered: record.text("relocation_covered"),
            travel_required: record.text("travel_required"),
        }
    }
}

impl JobId for Job {
    fn job_id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Answer {
    pub question_id: Option<String>,
    pub id: Option<String>,
    pub text: Option<String>,
}

impl Mapped for Answer {
    fn mapping() -> &'static Mapping {
        &ANSWER_MAPPING
    }

    fn from_record(record: &Record) -> Self {
        Self {
            question_id: record.text("question_id"),
            id: record.text("id"),
            text: record.text("text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Question {
    pub id: Option<String>,
    pub question_type: Option<String>,
    pub required: Option<String>,
    pub format: Option<String>,
    pub text: Option<String>,
    pub answers: Vec<Answer>,
}

impl Question {
    pub fn is_required(&self) -> bool {
        truthy(self.required.as_deref())
    }
}

impl Mapped for Question {
    fn mapping() -> &'static Mapping {
        &QUESTION_MAPPING
    }

    fn from_record(record: &Record) -> Self {
        Self {
            id: record.text("id"),
            question_type: record.text("question_type"),
            required: record.text("required"),
            format: record.text("format"),
            text: record.text("text"),
            answers: record.list("answers").iter().map(Answer::from_record).collect(),
        }
    }
}

/// The questions a job asks before a candidate can apply.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BlankApplication {
    pub apply_url: Option<String>,
    pub service_url: Option<String>,
    pub job_id: Option<String>,
    pub job_title: Option<String>,
    pub total_questions: Option<String>,
    pub total_required_questions: Option<String>,
    pub questions: Vec<Question>,
}

impl BlankApplication {
    /// Applications handled by the service itself report a question count;
    /// external ones only carry an apply URL.
    pub fn is_internal(&self) -> bool {
        self.total_questions.is_some()
    }

    pub fn is_external(&self) -> bool {
        !self.is_internal()
    }

    pub fn required_questions(&self) -> Vec<&Question> {
        self.questions.iter().filter(|q| q.is_required()).collect()
    }
}

impl Mapped for BlankApplication {
    fn mapping() -> &'static Mapping {
        &BLANK_APPLICATION_MAPPING
    }

    fn from_record(record: &Record) -> Self {
        Self {
            apply_url: record.text("apply_url"),
            service_url: record.text("service_url"),
            job_id: record.text("job_id"),
            job_title: record.text("job_title"),
            total_questions: record.text("total_questions"),
            total_required_questions: record.text("total_required_questions"),
            questions: record
                .list("questions")
                .iter()
                .map(Question::from_record)
                .collect(),
        }
    }
}

impl JobId for BlankApplication {
    fn job_id(&self) -> &str {
        self.job_id.as_deref().unwrap_or("")
    }
}

/// An `<Error>` element reported by the service.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ServiceError {
    pub message: String,
}

impl Mapped for ServiceError {
    fn mapping() -> &'static Mapping {
        &ERROR_MAPPING
    }

    fn from_record(record: &Record) -> Self {
        Self {
            message: record.text("message").unwrap_or_default(),
        }
    }
}

/// The service's answer to a submitted application.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResponseApplication {
    pub status: Option<String>,
    pub errors: Vec<ServiceError>,
}

impl ResponseApplication {
    pub fn is_complete(&self) -> bool {
        self.status
            .as_deref()
            .map_or(false, |s| s.to_ascii_lowercase().starts_with("complete"))
    }

    pub fn is_success(&self) -> bool {
        self.is_complete()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl Mapped for ResponseApplication {
    fn mapping() -> &'static Mapping {
        &RESPONSE_APPLICATION_MAPPING
    }

    fn from_record(record: &Record) -> Self {
        Self {
            status: record.text("status"),
            errors: record
                .list("errors")
                .iter()
                .map(ServiceError::from_record)
                .collect(),
        }
    }
}
