// CareerBuilder API client
use crate::cache::{CacheStats, ResponseCache};
use crate::config::ClientConfig;
use crate::models::{
    BlankApplication, Category, CategoryCode, Job, JobId, JobSearchResult, ResponseApplication,
    ServiceError,
};
use crate::request::RequestApplication;
use crate::transport::{HttpResponse, ReqwestTransport, Transport};
use crate::xml_mapper::{map_document, Mapped, MappingError, XmlElement};
use reqwest::Url;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Response code: {status_code}")]
    Transport { status_code: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Response has no {0} element")]
    MissingRecord(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

/// Location and paging for job searches. A zipcode or radius given here is
/// applied to the client first, with the usual cache reset on change.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSearch {
    pub zipcode: Option<String>,
    pub radius: Option<u32>,
    pub page: u32,
    pub per_page: u32,
    pub force: bool,
}

impl Default for JobSearch {
    fn default() -> Self {
        Self {
            zipcode: None,
            radius: None,
            page: 1,
            per_page: 100,
            force: false,
        }
    }
}

impl JobSearch {
    pub fn near(zipcode: impl Into<String>, radius: u32) -> Self {
        Self {
            zipcode: Some(zipcode.into()),
            radius: Some(radius),
            ..Default::default()
        }
    }

    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }
}

pub struct CareerBuilderClient<T: Transport = ReqwestTransport> {
    config: ClientConfig,
    api_key: String,
    zipcode: Option<String>,
    radius: Option<u32>,
    cache: ResponseCache,
    transport: T,
}

impl CareerBuilderClient<ReqwestTransport> {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.api_key()?;
        let transport = ReqwestTransport::new(Duration::from_millis(config.timeout_ms))?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> CareerBuilderClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ClientError> {
        let api_key = config.api_key()?.to_string();
        Url::parse(&config.base_url).map_err(|e| {
            ClientError::ConfigError(format!("invalid base URL {}: {}", config.base_url, e))
        })?;

        Ok(Self {
            zipcode: config.zipcode.clone(),
            radius: config.radius,
            config,
            api_key,
            cache: ResponseCache::new(),
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn zipcode(&self) -> Option<&str> {
        self.zipcode.as_deref()
    }

    pub fn radius(&self) -> Option<u32> {
        self.radius
    }

    /// Change the search zipcode. Every cache is dropped if it differs.
    pub fn set_zipcode(&mut self, zipcode: Option<String>) {
        if self.zipcode != zipcode {
            info!(?zipcode, "zipcode changed, resetting caches");
            self.cache.reset();
            self.zipcode = zipcode;
        }
    }

    /// Change the search radius in miles. Every cache is dropped if it differs.
    pub fn set_radius(&mut self, radius: Option<u32>) {
        if self.radius != radius {
            info!(?radius, "radius changed, resetting caches");
            self.cache.reset();
            self.radius = radius;
        }
    }

    /// All categories. Cached unless `force` is set.
    pub async fn categories(&mut self, force: bool) -> Result<Vec<Category>, ApiError> {
        if !force {
            if let Some(categories) = self.cache.categories() {
                debug!("categories served from cache");
                return Ok(categories);
            }
        }

        let categories: Vec<Category> = self.categories_as().await?;
        self.cache.store_categories(categories.clone());
        Ok(categories)
    }

    /// Category names keyed by code, e.g. `"JN001" => "Accounting"`. Cached
    /// unless `force` is set; a rebuild always refetches the categories.
    pub async fn categories_by_code(
        &mut self,
        force: bool,
    ) -> Result<HashMap<String, String>, ApiError> {
        if !force {
            if let Some(by_code) = self.cache.categories_by_code() {
                debug!("category names served from cache");
                return Ok(by_code);
            }
        }

        let by_code: HashMap<String, String> = self
            .categories(true)
            .await?
            .into_iter()
            .map(|c| (c.code.unwrap_or_default(), c.name.unwrap_or_default()))
            .collect();
        self.cache.store_categories_by_code(by_code.clone());
        Ok(by_code)
    }

    /// Every job near the current location, across all categories.
    ///
    /// One search is issued per category. A job listed under several
    /// categories is returned once, as first seen, with the codes of the
    /// later listings appended to its `categories`. Only the combined list
    /// is cached, and only once every category search has succeeded.
    pub async fn jobs(&mut self, search: &JobSearch) -> Result<Vec<JobSearchResult>, ApiError> {
        self.apply_location(search);
        let (zipcode, radius) = self.require_location()?;

        if !search.force {
            if let Some(jobs) = self.cache.jobs() {
                debug!("jobs served from cache");
                return Ok(jobs);
            }
        }

        let categories = self.categories(false).await?;
        let mut results = Vec::new();
        for category in &categories {
            let code = category.category_code();
            results.extend(self.stamped_search(code, &zipcode, radius, search).await?);
        }

        let jobs = merge_duplicates(results);
        self.cache.store_jobs(jobs.clone());
        Ok(jobs)
    }

    /// Jobs near the current location in one category. Every result carries
    /// exactly the requested category code.
    pub async fn category_jobs<C: CategoryCode + ?Sized>(
        &mut self,
        category: &C,
        search: &JobSearch,
    ) -> Result<Vec<JobSearchResult>, ApiError> {
        self.apply_location(search);
        let (zipcode, radius) = self.require_location()?;
        let code = category.category_code().to_string();

        if !search.force {
            if let Some(jobs) = self.cache.category_jobs(&code) {
                debug!(category = %code, "category jobs served from cache");
                return Ok(jobs);
            }
        }

        let jobs = self.stamped_search(&code, &zipcode, radius, search).await?;
        self.cache.store_category_jobs(code, jobs.clone());
        Ok(jobs)
    }

    /// Full detail for one job. Cached per job id unless `force` is set.
    pub async fn job<J: JobId + ?Sized>(&mut self, job: &J, force: bool) -> Result<Job, ApiError> {
        let id = job.job_id().to_string();
        if !force {
            if let Some(job) = self.cache.job(&id) {
                debug!(job = %id, "job served from cache");
                return Ok(job);
            }
        }

        let job: Job = self.job_as(id.as_str()).await?;
        self.cache.store_job(id, job.clone());
        Ok(job)
    }

    /// The questions to answer before applying. Cached per job id unless
    /// `force` is set.
    pub async fn application<J: JobId + ?Sized>(
        &mut self,
        job: &J,
        force: bool,
    ) -> Result<BlankApplication, ApiError> {
        let id = job.job_id().to_string();
        if !force {
            if let Some(application) = self.cache.application(&id) {
                debug!(job = %id, "application served from cache");
                return Ok(application);
            }
        }

        let application: BlankApplication = self.application_as(id.as_str()).await?;
        self.cache.store_application(id, application.clone());
        Ok(application)
    }

    /// Submit an application. Validation problems come back in the
    /// response's `errors`, not as an `Err`.
    pub async fn apply(
        &self,
        application: &RequestApplication,
    ) -> Result<ResponseApplication, ApiError> {
        self.apply_as(application).await
    }

    /// Submit an application in test mode.
    pub async fn apply_test(
        &self,
        mut application: RequestApplication,
    ) -> Result<ResponseApplication, ApiError> {
        application.test = Some(true);
        self.apply(&application).await
    }

    // The `_as` variants map responses into caller-supplied record types.
    // They always hit the network and never touch the cache.

    pub async fn categories_as<R: Mapped>(&self) -> Result<Vec<R>, ApiError> {
        let document = self
            .get("/categories", &[("CountryCode", "US".to_string())])
            .await?;
        Ok(map_document(&document))
    }

    /// Search one category without stamping or caching the results.
    pub async fn category_jobs_as<R: Mapped, C: CategoryCode + ?Sized>(
        &mut self,
        category: &C,
        search: &JobSearch,
    ) -> Result<Vec<R>, ApiError> {
        self.apply_location(search);
        let (zipcode, radius) = self.require_location()?;
        self.search_category(category.category_code(), &zipcode, radius, search)
            .await
    }

    pub async fn job_as<R: Mapped, J: JobId + ?Sized>(&self, job: &J) -> Result<R, ApiError> {
        let document = self
            .get("/job", &[("DID", job.job_id().to_string())])
            .await?;
        first_record(&document)
    }

    pub async fn application_as<R: Mapped, J: JobId + ?Sized>(
        &self,
        job: &J,
    ) -> Result<R, ApiError> {
        let document = self
            .get("/application/blank", &[("JobDID", job.job_id().to_string())])
            .await?;
        first_record(&document)
    }

    pub async fn apply_as<R: Mapped>(
        &self,
        application: &RequestApplication,
    ) -> Result<R, ApiError> {
        let body = application
            .to_xml(&self.api_key, self.config.test_mode)
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        let url = self.url("/application/submit")?;

        debug!(path = url.path(), job = %application.job_id, "POST");
        let response = self.transport.post(&url, body).await?;
        check_status(&response)?;

        let document = XmlElement::parse(&response.body)?;
        first_record(&document)
    }

    async fn search_category<R: Mapped>(
        &self,
        code: &str,
        zipcode: &str,
        radius: u32,
        search: &JobSearch,
    ) -> Result<Vec<R>, ApiError> {
        let params = [
            ("Location", zipcode.to_string()),
            ("Radius", radius.to_string()),
            ("PostedWithin", "1".to_string()),
            ("PerPage", search.per_page.to_string()),
            ("PageNumber", search.page.to_string()),
            ("Category", code.to_string()),
        ];
        let document = self.get("/jobsearch", &params).await?;
        Ok(map_document(&document))
    }

    async fn stamped_search(
        &self,
        code: &str,
        zipcode: &str,
        radius: u32,
        search: &JobSearch,
    ) -> Result<Vec<JobSearchResult>, ApiError> {
        let mut jobs: Vec<JobSearchResult> =
            self.search_category(code, zipcode, radius, search).await?;
        for job in &mut jobs {
            job.categories = vec![code.to_string()];
        }
        Ok(jobs)
    }

    fn apply_location(&mut self, search: &JobSearch) {
        if let Some(zipcode) = &search.zipcode {
            self.set_zipcode(Some(zipcode.clone()));
        }
        if let Some(radius) = search.radius {
            self.set_radius(Some(radius));
        }
    }

    fn require_location(&self) -> Result<(String, u32), ApiError> {
        match (&self.zipcode, self.radius) {
            (Some(zipcode), Some(radius)) => Ok((zipcode.clone(), radius)),
            _ => Err(ApiError::InvalidRequest(
                "zipcode and radius are required".to_string(),
            )),
        }
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.config.base_url.trim_end_matches('/');
        Url::parse(&format!("{}{}", base, path))
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))
    }

    fn query_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.url(path)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("DeveloperKey", &self.api_key);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<XmlElement, ApiError> {
        let url = self.query_url(path, params)?;

        debug!(path = url.path(), "GET");
        let response = self.transport.get(&url).await?;
        check_status(&response)?;

        let document = XmlElement::parse(&response.body)?;
        check_errors(&document)?;
        Ok(document)
    }
}

fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.status != 200 {
        warn!(status = response.status, "unexpected response status");
        return Err(ApiError::Transport {
            status_code: response.status,
        });
    }
    Ok(())
}

// Only the first reported error is surfaced.
fn check_errors(document: &XmlElement) -> Result<(), ApiError> {
    let errors: Vec<ServiceError> = map_document(document);
    if let Some(error) = errors.into_iter().next() {
        warn!(message = %error.message, "service reported an error");
        return Err(ApiError::Service(error.message));
    }
    Ok(())
}

fn first_record<R: Mapped>(document: &XmlElement) -> Result<R, ApiError> {
    map_document::<R>(document)
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::MissingRecord(R::mapping().element()))
}

fn merge_duplicates(jobs: Vec<JobSearchResult>) -> Vec<JobSearchResult> {
    let mut merged: Vec<JobSearchResult> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for job in jobs {
        match positions.get(job.job_id()) {
            Some(&index) => {
                if let Some(category) = job.categories.into_iter().next() {
                    merged[index].categories.push(category);
                }
            }
            None => {
                positions.insert(job.job_id().to_string(), merged.len());
                merged.push(job);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock_transport::MockTransport;
    use crate::xml_mapper::{FieldRule, Mapping, Record};

    const BASE_URL: &str = "http://api.test/v1";
    const CATEGORIES_XML: &str = include_str!("../samples/categories_response.xml");
    const JOB_SEARCH_XML: &str = include_str!("../samples/job_search_response.xml");
    const JOB_XML: &str = include_str!("../samples/job_response.xml");
    const BLANK_APPLICATION_XML: &str = include_str!("../samples/blank_application_response.xml");
    const RESPONSE_APPLICATION_XML: &str =
        include_str!("../samples/response_application_response.xml");
    const ERROR_XML: &str = include_str!("../samples/error_response.xml");

    const TWO_CATEGORIES_XML: &str = "<ResponseCategories><Categories>\
        <Category><Code>A</Code><Name>Alpha</Name></Category>\
        <Category><Code>B</Code><Name>Beta</Name></Category>\
        </Categories></ResponseCategories>";

    fn search_xml(results: &[(&str, &str)]) -> String {
        let items: String = results
            .iter()
            .map(|(id, title)| {
                format!(
                    "<JobSearchResult><DID>{}</DID><JobTitle>{}</JobTitle></JobSearchResult>",
                    id, title
                )
            })
            .collect();
        format!(
            "<ResponseJobSearch><Errors/><Results>{}</Results></ResponseJobSearch>",
            items
        )
    }

    fn config() -> ClientConfig {
        ClientConfig {
            base_url: BASE_URL.to_string(),
            ..ClientConfig::with_api_key("DEVKEY")
        }
    }

    fn client(transport: MockTransport) -> CareerBuilderClient<MockTransport> {
        CareerBuilderClient::with_transport(config(), transport).unwrap()
    }

    fn located_client(transport: MockTransport) -> CareerBuilderClient<MockTransport> {
        let mut client = client(transport);
        client.set_zipcode(Some("90210".to_string()));
        client.set_radius(Some(25));
        client
    }

    /// Fill every cache slot against a transport serving all fixtures.
    async fn warmed_client() -> CareerBuilderClient<MockTransport> {
        let transport = MockTransport::new()
            .with_response("/categories", 200, CATEGORIES_XML)
            .with_response("/jobsearch", 200, JOB_SEARCH_XML)
            .with_response("/job", 200, JOB_XML)
            .with_response("/application/blank", 200, BLANK_APPLICATION_XML);
        let mut client = located_client(transport);

        client.categories_by_code(false).await.unwrap();
        client.jobs(&JobSearch::default()).await.unwrap();
        client.job("J3F7CR6Z5N1234", false).await.unwrap();
        client.application("J3F7CR6Z5N1234", false).await.unwrap();
        client
    }

    #[test]
    fn test_new_requires_api_key() {
        let result = CareerBuilderClient::new(ClientConfig::default());
        assert!(matches!(result, Err(ClientError::ConfigError(_))));

        let result =
            CareerBuilderClient::with_transport(ClientConfig::default(), MockTransport::new());
        assert!(matches!(result, Err(ClientError::ConfigError(_))));
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        let config = ClientConfig {
            base_url: "not a url".to_string(),
            ..ClientConfig::with_api_key("DEVKEY")
        };
        let result = CareerBuilderClient::with_transport(config, MockTransport::new());
        assert!(matches!(result, Err(ClientError::ConfigError(_))));
    }

    #[test]
    fn test_new_takes_location_from_config() {
        let config = ClientConfig {
            zipcode: Some("58102".to_string()),
            radius: Some(10),
            ..config()
        };
        let client = CareerBuilderClient::with_transport(config, MockTransport::new()).unwrap();
        assert_eq!(client.zipcode(), Some("58102"));
        assert_eq!(client.radius(), Some(10));
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_categories_request_and_cache() {
        let mut client =
            client(MockTransport::new().with_response("/categories", 200, CATEGORIES_XML));

        let categories = client.categories(false).await.unwrap();
        assert_eq!(categories.len(), 3);
        assert_eq!(categories[0].code.as_deref(), Some("JN001"));

        let request = &client.transport().requests()[0];
        assert_eq!(request.method, "GET");
        assert_eq!(request.url.path(), "/v1/categories");
        assert_eq!(request.param("DeveloperKey").as_deref(), Some("DEVKEY"));
        assert_eq!(request.param("CountryCode").as_deref(), Some("US"));

        assert_eq!(client.categories(false).await.unwrap(), categories);
        assert_eq!(client.transport().request_count(), 1);

        client.categories(true).await.unwrap();
        assert_eq!(client.transport().request_count(), 2);
    }

    #[tokio::test]
    async fn test_categories_by_code_always_refreshes_categories() {
        let transport = MockTransport::new()
            .with_response("/categories", 200, TWO_CATEGORIES_XML)
            .with_response("/categories", 200, CATEGORIES_XML);
        let mut client = client(transport);

        let stale = client.categories(false).await.unwrap();
        assert_eq!(stale.len(), 2);

        let by_code = client.categories_by_code(false).await.unwrap();
        let fresh = client.categories(false).await.unwrap();
        let expected: HashMap<String, String> = fresh
            .iter()
            .map(|c| (c.code.clone().unwrap(), c.name.clone().unwrap()))
            .collect();

        assert_eq!(by_code, expected);
        assert_eq!(by_code.len(), 3);
        assert_eq!(by_code["JN054"], "Research & Development");
        assert_eq!(client.transport().request_count(), 2);

        // cached now
        client.categories_by_code(false).await.unwrap();
        assert_eq!(client.transport().request_count(), 2);
    }

    #[tokio::test]
    async fn test_category_jobs_query_and_stamping() {
        let mut client =
            located_client(MockTransport::new().with_response("/jobsearch", 200, JOB_SEARCH_XML));

        let search = JobSearch::default().page(2, 50);
        let jobs = client.category_jobs("JN001", &search).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.categories == vec!["JN001".to_string()]));

        let request = &client.transport().requests()[0];
        assert_eq!(request.url.path(), "/v1/jobsearch");
        assert_eq!(request.param("DeveloperKey").as_deref(), Some("DEVKEY"));
        assert_eq!(request.param("Location").as_deref(), Some("90210"));
        assert_eq!(request.param("Radius").as_deref(), Some("25"));
        assert_eq!(request.param("PostedWithin").as_deref(), Some("1"));
        assert_eq!(request.param("PerPage").as_deref(), Some("50"));
        assert_eq!(request.param("PageNumber").as_deref(), Some("2"));
        assert_eq!(request.param("Category").as_deref(), Some("JN001"));
    }

    #[tokio::test]
    async fn test_category_jobs_accepts_category_records() {
        let mut client =
            located_client(MockTransport::new().with_response("/jobsearch", 200, JOB_SEARCH_XML));
        let category = Category {
            code: Some("JN054".to_string()),
            name: Some("Research & Development".to_string()),
        };

        let jobs = client.category_jobs(&category, &JobSearch::default()).await.unwrap();
        assert!(jobs.iter().all(|j| j.categories == vec!["JN054".to_string()]));
        assert_eq!(client.transport().requests()[0].param("Category").as_deref(), Some("JN054"));

        // same slot as the bare code
        client.category_jobs("JN054", &JobSearch::default()).await.unwrap();
        assert_eq!(client.transport().request_count(), 1);
    }

    #[tokio::test]
    async fn test_search_requires_location() {
        let mut client = client(MockTransport::new());

        let result = client.category_jobs("JN001", &JobSearch::default()).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));

        client.set_zipcode(Some("90210".to_string()));
        let result = client.jobs(&JobSearch::default()).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));

        assert_eq!(client.transport().request_count(), 0);
    }

    #[tokio::test]
    async fn test_search_options_set_location() {
        let mut client =
            client(MockTransport::new().with_response("/jobsearch", 200, JOB_SEARCH_XML));

        client
            .category_jobs("JN001", &JobSearch::near("58102", 15))
            .await
            .unwrap();
        assert_eq!(client.zipcode(), Some("58102"));
        assert_eq!(client.radius(), Some(15));
        assert_eq!(client.transport().requests()[0].param("Radius").as_deref(), Some("15"));
    }

    #[tokio::test]
    async fn test_jobs_merges_duplicates_across_categories() {
        let transport = MockTransport::new()
            .with_response("/categories", 200, TWO_CATEGORIES_XML)
            .with_response(
                "/jobsearch",
                200,
                &search_xml(&[("J1", "Shared"), ("J2", "Only A")]),
            )
            .with_response(
                "/jobsearch",
                200,
                &search_xml(&[("J3", "Only B"), ("J1", "Shared again")]),
            );
        let mut client = located_client(transport);

        let jobs = client.jobs(&JobSearch::default()).await.unwrap();
        let ids: Vec<&str> = jobs.iter().map(|j| j.job_id()).collect();
        assert_eq!(ids, vec!["J1", "J2", "J3"]);

        let shared = &jobs[0];
        assert_eq!(shared.categories, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(shared.title.as_deref(), Some("Shared"));
        assert_eq!(jobs[1].categories, vec!["A".to_string()]);
        assert_eq!(jobs[2].categories, vec!["B".to_string()]);

        let requests = client.transport().requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].param("Category").as_deref(), Some("A"));
        assert_eq!(requests[2].param("Category").as_deref(), Some("B"));

        // the combined search leaves the per-category slots alone
        let only_b = client.category_jobs("B", &JobSearch::default()).await.unwrap();
        assert_eq!(only_b[1].categories, vec!["B".to_string()]);
        assert_eq!(client.transport().request_count(), 4);

        client.jobs(&JobSearch::default()).await.unwrap();
        assert_eq!(client.transport().request_count(), 4);
    }

    #[tokio::test]
    async fn test_job_by_id_and_by_record_share_query_and_slot() {
        let mut client = client(MockTransport::new().with_response("/job", 200, JOB_XML));

        let job = client.job("J3F7CR6Z5N1234", false).await.unwrap();
        assert_eq!(job.title.as_deref(), Some("Staff Accountant"));

        let by_record = client.job(&job, false).await.unwrap();
        assert_eq!(by_record, job);
        assert_eq!(client.transport().request_count(), 1);

        client.job(&job, true).await.unwrap();
        let requests = client.transport().requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, requests[1].url);
        assert_eq!(requests[0].param("DID").as_deref(), Some("J3F7CR6Z5N1234"));
    }

    #[tokio::test]
    async fn test_application_fetch_and_cache() {
        let mut client = client(MockTransport::new().with_response(
            "/application/blank",
            200,
            BLANK_APPLICATION_XML,
        ));
        let result = JobSearchResult {
            id: Some("J3F7CR6Z5N1234".to_string()),
            ..Default::default()
        };

        let application = client.application(&result, false).await.unwrap();
        assert!(application.is_internal());
        assert_eq!(application.questions.len(), 2);

        let request = &client.transport().requests()[0];
        assert_eq!(request.url.path(), "/v1/application/blank");
        assert_eq!(request.param("JobDID").as_deref(), Some("J3F7CR6Z5N1234"));

        client.application("J3F7CR6Z5N1234", false).await.unwrap();
        assert_eq!(client.transport().request_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_record_is_an_error() {
        let mut client = client_with_body("<ResponseJob><Errors/></ResponseJob>");
        let result = client.job("J1", false).await;
        assert!(matches!(result, Err(ApiError::MissingRecord("Job"))));
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_service_error_with_ok_status() {
        let mut client = client(MockTransport::new().with_response("/categories", 200, ERROR_XML));
        match client.categories(false).await {
            Err(ApiError::Service(message)) => assert_eq!(message, "Invalid key"),
            other => panic!("Expected service error, got {:?}", other),
        }

        let mut client = client_with_body("<Error><Error>Invalid key</Error></Error>");
        match client.job("J1", false).await {
            Err(ApiError::Service(message)) => assert_eq!(message, "Invalid key"),
            other => panic!("Expected service error, got {:?}", other),
        }
        assert!(client.cache().is_empty());
    }

    fn client_with_body(body: &str) -> CareerBuilderClient<MockTransport> {
        client(MockTransport::new().with_response("/job", 200, body))
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_mapping_error() {
        let mut client = client_with_body("<ResponseJob><Job></ResponseJob>");
        let result = client.job("J1", false).await;
        assert!(matches!(result, Err(ApiError::Mapping(_))));
    }

    #[tokio::test]
    async fn test_server_error_leaves_every_cache_untouched() {
        let mut client = warmed_client().await;
        let before = client.transport().request_count();

        for path in ["/categories", "/jobsearch", "/job", "/application/blank"] {
            client.transport().set_response(path, 500, "");
        }

        let search = JobSearch::default().force();
        let errors = vec![
            client.categories(true).await.err(),
            client.categories_by_code(true).await.err(),
            client.jobs(&search).await.err(),
            client.category_jobs("JN001", &search).await.err(),
            client.job("J3F7CR6Z5N1234", true).await.err(),
            client.application("J3F7CR6Z5N1234", true).await.err(),
        ];
        for error in errors {
            assert!(matches!(error, Some(ApiError::Transport { status_code: 500 })));
        }

        // cached values still come from the earlier successful calls
        assert_eq!(client.categories(false).await.unwrap().len(), 3);
        assert_eq!(client.categories_by_code(false).await.unwrap().len(), 3);
        assert_eq!(client.jobs(&JobSearch::default()).await.unwrap().len(), 2);
        assert_eq!(client.job("J3F7CR6Z5N1234", false).await.unwrap().categories.len(), 2);
        assert!(client.application("J3F7CR6Z5N1234", false).await.is_ok());
        assert_eq!(client.transport().request_count(), before + 6);
    }

    #[tokio::test]
    async fn test_network_failure_surfaces() {
        let mut client = client(MockTransport::new());
        client.transport().fail_network(true);
        assert!(matches!(client.categories(false).await, Err(ApiError::Network(_))));
    }

    #[tokio::test]
    async fn test_location_change_resets_every_cache() {
        let mut client = warmed_client().await;
        assert!(!client.cache().is_empty());

        client.set_zipcode(Some("90210".to_string()));
        client.set_radius(Some(25));
        assert!(!client.cache().is_empty());
        assert_eq!(client.cache_stats().reset_count, 2);

        client.set_radius(Some(50));
        assert!(client.cache().is_empty());
        assert_eq!(client.cache_stats().reset_count, 3);

        let mut client = warmed_client().await;
        client.set_zipcode(Some("10001".to_string()));
        assert!(client.cache().is_empty());

        let before = client.transport().request_count();
        client.categories(false).await.unwrap();
        assert_eq!(client.transport().request_count(), before + 1);
    }

    #[tokio::test]
    async fn test_apply_posts_application() {
        let client = client(MockTransport::new().with_response(
            "/application/submit",
            200,
            RESPONSE_APPLICATION_XML,
        ));

        let application =
            RequestApplication::new("J3F7CR6Z5N1234").with_response("ApplicantName", "Jane Doe");
        let response = client.apply(&application).await.unwrap();
        assert!(!response.is_complete());
        assert_eq!(response.errors.len(), 2);

        let request = &client.transport().requests()[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.url.path(), "/v1/application/submit");
        assert_eq!(request.url.query(), None);
        let body = request.body.as_deref().unwrap();
        assert!(body.contains("<DeveloperKey>DEVKEY</DeveloperKey>"));
        assert!(body.contains("<JobDID>J3F7CR6Z5N1234</JobDID>"));
        assert!(body.contains("<Test>False</Test>"));

        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_apply_test_forces_test_flag() {
        let client = client(MockTransport::new().with_response(
            "/application/submit",
            200,
            "<ResponseApplication><ApplicationStatus>Complete</ApplicationStatus><Errors/></ResponseApplication>",
        ));

        let application = RequestApplication::new("J1").with_test(false);
        let response = client.apply_test(application).await.unwrap();
        assert!(response.is_success());
        assert!(!response.has_errors());

        let body = client.transport().requests()[0].body.clone().unwrap();
        assert!(body.contains("<Test>True</Test>"));
    }

    #[tokio::test]
    async fn test_apply_uses_configured_test_mode() {
        let config = ClientConfig {
            test_mode: true,
            ..config()
        };
        let client = CareerBuilderClient::with_transport(
            config,
            MockTransport::new().with_response(
                "/application/submit",
                200,
                RESPONSE_APPLICATION_XML,
            ),
        )
        .unwrap();

        client.apply(&RequestApplication::new("J1")).await.unwrap();
        let body = client.transport().requests()[0].body.clone().unwrap();
        assert!(body.contains("<Test>True</Test>"));
    }

    #[tokio::test]
    async fn test_apply_checks_status() {
        let client = client(MockTransport::new().with_response("/application/submit", 503, ""));
        let result = client.apply(&RequestApplication::new("J1")).await;
        assert!(matches!(result, Err(ApiError::Transport { status_code: 503 })));
    }

    #[test]
    fn test_query_values_are_encoded() {
        let client = client(MockTransport::new());
        let url = client
            .query_url(
                "/jobsearch",
                &[
                    ("Location", "Beverly Hills, CA".to_string()),
                    ("Category", "R&D".to_string()),
                ],
            )
            .unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("Location=Beverly+Hills%2C+CA"));
        assert!(query.contains("Category=R%26D"));
        assert!(query.starts_with("DeveloperKey=DEVKEY"));
    }

    #[test]
    fn test_merge_duplicates_keeps_first_record() {
        let job = |id: &str, title: &str, category: &str| JobSearchResult {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            categories: vec![category.to_string()],
            ..Default::default()
        };

        let merged = merge_duplicates(vec![
            job("J1", "first", "A"),
            job("J2", "other", "A"),
            job("J1", "second", "B"),
            job("J1", "third", "C"),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].title.as_deref(), Some("first"));
        assert_eq!(merged[0].categories, vec!["A", "B", "C"]);
        assert_eq!(merged[1].categories, vec!["A"]);
    }

    #[derive(Debug, PartialEq)]
    struct JobHeadline {
        title: String,
        company: String,
    }

    static JOB_HEADLINE_MAPPING: Mapping = Mapping {
        selector: "//Job",
        fields: &[
            FieldRule::text("title", "JobTitle"),
            FieldRule::text("company", "Company"),
        ],
    };

    impl Mapped for JobHeadline {
        fn mapping() -> &'static Mapping {
            &JOB_HEADLINE_MAPPING
        }

        fn from_record(record: &Record) -> Self {
            Self {
                title: record.text("title").unwrap_or_default(),
                company: record.text("company").unwrap_or_default(),
            }
        }
    }

    #[tokio::test]
    async fn test_job_as_maps_into_custom_record() {
        let client = client(MockTransport::new().with_response("/job", 200, JOB_XML));

        let headline: JobHeadline = client.job_as("J3F7CR6Z5N1234").await.unwrap();
        assert_eq!(headline.title, "Staff Accountant");
        assert_eq!(headline.company, "Acme Corp");

        assert_eq!(
            client.transport().requests()[0].param("DID").as_deref(),
            Some("J3F7CR6Z5N1234")
        );
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_custom_record_variants_bypass_cache() {
        let transport = MockTransport::new()
            .with_response("/categories", 200, CATEGORIES_XML)
            .with_response("/jobsearch", 200, JOB_SEARCH_XML)
            .with_response("/application/blank", 200, BLANK_APPLICATION_XML);
        let mut client = located_client(transport);

        let categories: Vec<Category> = client.categories_as().await.unwrap();
        assert_eq!(categories.len(), 3);

        let results: Vec<JobSearchResult> = client
            .category_jobs_as("JN001", &JobSearch::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|j| j.categories.is_empty()));

        let application: BlankApplication =
            client.application_as("J3F7CR6Z5N1234").await.unwrap();
        assert_eq!(application.questions.len(), 2);

        assert!(client.cache().is_empty());
        client.categories(false).await.unwrap();
        assert_eq!(client.transport().request_count(), 4);
    }

    #[tokio::test]
    async fn test_failed_jobs_search_caches_nothing() {
        let transport = MockTransport::new()
            .with_response("/categories", 200, TWO_CATEGORIES_XML)
            .with_response("/jobsearch", 200, &search_xml(&[("J1", "Only A")]))
            .with_response("/jobsearch", 500, "");
        let mut client = located_client(transport);

        let result = client.jobs(&JobSearch::default()).await;
        assert!(matches!(result, Err(ApiError::Transport { status_code: 500 })));
        assert_eq!(client.transport().request_count(), 3);

        client.transport().set_response("/jobsearch", 200, &search_xml(&[("J1", "Only A")]));
        let only_a = client.category_jobs("A", &JobSearch::default()).await.unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(client.transport().request_count(), 4);

        client.jobs(&JobSearch::default()).await.unwrap();
        assert_eq!(client.transport().request_count(), 6);
    }
}
