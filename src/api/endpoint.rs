use reqwest::Url;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Logical backend operations. The variant names are the operation names the
/// backend team uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    // Users & auth
    Login,
    Register,
    SwitchUser,
    ChangePassword,
    UserList,
    UserInfo,
    DeleteUser,
    // Stock
    StockParams,
    AddStock,
    StockData,
    // End of day
    EndOfDayListData,
    EndOfData,
    // Freezers
    FreezerList,
    AddFreezer,
    DeleteFreezer,
    FreezerTemperatureList,
    AddFreezerTemperature,
    // Holidays
    HolidayList,
    AddHoliday,
    DeleteHoliday,
    // Custom orders
    CustomOrderList,
    AddCustomOrder,
    UpdateCustomOrder,
    DeleteCustomOrder,
    // Production guessing
    GuessingData,
    ProductionPlan,
    // Reports
    ReportData,
    ReportPdf,
}

impl Endpoint {
    pub const ALL: [Endpoint; 28] = [
        Endpoint::Login,
        Endpoint::Register,
        Endpoint::SwitchUser,
        Endpoint::ChangePassword,
        Endpoint::UserList,
        Endpoint::UserInfo,
        Endpoint::DeleteUser,
        Endpoint::StockParams,
        Endpoint::AddStock,
        Endpoint::StockData,
        Endpoint::EndOfDayListData,
        Endpoint::EndOfData,
        Endpoint::FreezerList,
        Endpoint::AddFreezer,
        Endpoint::DeleteFreezer,
        Endpoint::FreezerTemperatureList,
        Endpoint::AddFreezerTemperature,
        Endpoint::HolidayList,
        Endpoint::AddHoliday,
        Endpoint::DeleteHoliday,
        Endpoint::CustomOrderList,
        Endpoint::AddCustomOrder,
        Endpoint::UpdateCustomOrder,
        Endpoint::DeleteCustomOrder,
        Endpoint::GuessingData,
        Endpoint::ProductionPlan,
        Endpoint::ReportData,
        Endpoint::ReportPdf,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Login => "Login",
            Endpoint::Register => "Register",
            Endpoint::SwitchUser => "SwitchUser",
            Endpoint::ChangePassword => "ChangePassword",
            Endpoint::UserList => "UserList",
            Endpoint::UserInfo => "UserInfo",
            Endpoint::DeleteUser => "DeleteUser",
            Endpoint::StockParams => "StockParams",
            Endpoint::AddStock => "AddStock",
            Endpoint::StockData => "StockData",
            Endpoint::EndOfDayListData => "EndOfDayListData",
            Endpoint::EndOfData => "EndOfData",
            Endpoint::FreezerList => "FreezerList",
            Endpoint::AddFreezer => "AddFreezer",
            Endpoint::DeleteFreezer => "DeleteFreezer",
            Endpoint::FreezerTemperatureList => "FreezerTemperatureList",
            Endpoint::AddFreezerTemperature => "AddFreezerTemperature",
            Endpoint::HolidayList => "HolidayList",
            Endpoint::AddHoliday => "AddHoliday",
            Endpoint::DeleteHoliday => "DeleteHoliday",
            Endpoint::CustomOrderList => "CustomOrderList",
            Endpoint::AddCustomOrder => "AddCustomOrder",
            Endpoint::UpdateCustomOrder => "UpdateCustomOrder",
            Endpoint::DeleteCustomOrder => "DeleteCustomOrder",
            Endpoint::GuessingData => "GuessingData",
            Endpoint::ProductionPlan => "ProductionPlan",
            Endpoint::ReportData => "ReportData",
            Endpoint::ReportPdf => "ReportPdf",
        }
    }

    /// Path below the base URL, always `/api/<resource>/<action>`
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Login => "/api/user/login",
            Endpoint::Register => "/api/user/register",
            Endpoint::SwitchUser => "/api/user/switch",
            Endpoint::ChangePassword => "/api/user/change_password",
            Endpoint::UserList => "/api/user/list",
            Endpoint::UserInfo => "/api/user/info",
            Endpoint::DeleteUser => "/api/user/delete",
            Endpoint::StockParams => "/api/stock/params",
            Endpoint::AddStock => "/api/stock/add",
            Endpoint::StockData => "/api/stock/data",
            Endpoint::EndOfDayListData => "/api/endofday/list",
            Endpoint::EndOfData => "/api/endofday/add",
            Endpoint::FreezerList => "/api/freezer/list",
            Endpoint::AddFreezer => "/api/freezer/add",
            Endpoint::DeleteFreezer => "/api/freezer/delete",
            Endpoint::FreezerTemperatureList => "/api/freezer/temperature_list",
            Endpoint::AddFreezerTemperature => "/api/freezer/add_temperature",
            Endpoint::HolidayList => "/api/holiday/list",
            Endpoint::AddHoliday => "/api/holiday/add",
            Endpoint::DeleteHoliday => "/api/holiday/delete",
            Endpoint::CustomOrderList => "/api/customorder/list",
            Endpoint::AddCustomOrder => "/api/customorder/add",
            Endpoint::UpdateCustomOrder => "/api/customorder/update",
            Endpoint::DeleteCustomOrder => "/api/customorder/delete",
            Endpoint::GuessingData => "/api/guessing/data",
            Endpoint::ProductionPlan => "/api/guessing/production",
            Endpoint::ReportData => "/api/report/data",
            Endpoint::ReportPdf => "/api/report/pdf",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::ALL
            .iter()
            .copied()
            .find(|e| e.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown endpoint '{}'", s))
    }
}

/// Endpoint -> absolute URL, resolved once from the base URL
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    base_url: Url,
    urls: HashMap<Endpoint, Url>,
}

impl EndpointRegistry {
    pub fn new(base_url: &str) -> Result<Self, String> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let base = Url::parse(trimmed).map_err(|e| format!("Invalid base URL '{}': {}", base_url, e))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(format!("Unsupported URL scheme '{}'", base.scheme()));
        }

        let mut urls = HashMap::with_capacity(Endpoint::ALL.len());
        for endpoint in Endpoint::ALL {
            let url = Url::parse(&format!("{}{}", trimmed, endpoint.path()))
                .map_err(|e| format!("Cannot build URL for {}: {}", endpoint, e))?;
            urls.insert(endpoint, url);
        }

        Ok(Self {
            base_url: base,
            urls,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url(&self, endpoint: Endpoint) -> &Url {
        // Every variant is inserted in new()
        &self.urls[&endpoint]
    }

    /// Resolve a server-provided link: absolute URLs are kept, relative ones
    /// are joined onto the base URL
    pub fn resolve(&self, link: &str) -> Result<Url, String> {
        if let Ok(url) = Url::parse(link) {
            return Ok(url);
        }

        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(link.trim_start_matches('/'))
            .map_err(|e| format!("Cannot resolve link '{}': {}", link, e))
    }
}
