//! Dashboard navigation: which section is shown and which sub-section of
//! it.
//!
//! Every section with sub-sections remembers the last one visited, so
//! returning to it restores that view. Pure and synchronous.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use layrbase_core::error::LayrbaseError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Dashboard,
    Company,
    Finance,
    Legal,
    Captable,
    Marketing,
    Sales,
    Hr,
    Marketplace,
    Myorgs,
}

impl Section {
    pub const ALL: [Section; 10] = [
        Section::Dashboard,
        Section::Company,
        Section::Finance,
        Section::Legal,
        Section::Captable,
        Section::Marketing,
        Section::Sales,
        Section::Hr,
        Section::Marketplace,
        Section::Myorgs,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Section::Dashboard => "dashboard",
            Section::Company => "company",
            Section::Finance => "finance",
            Section::Legal => "legal",
            Section::Captable => "captable",
            Section::Marketing => "marketing",
            Section::Sales => "sales",
            Section::Hr => "hr",
            Section::Marketplace => "marketplace",
            Section::Myorgs => "myorgs",
        }
    }

    /// Sub-sections in display order; the first one is the default.
    pub fn sub_sections(self) -> &'static [SubSection] {
        use SubSection::*;
        match self {
            Section::Company => &[CompanyOverview, CompanyProfile, CompanyBranding, CompanyDocuments],
            Section::Finance => &[
                FinanceOverview,
                FinanceTransactions,
                FinanceInvoices,
                FinanceBudgets,
                FinanceReports,
            ],
            Section::Legal => &[LegalCompliance, LegalContracts, LegalDocuments, LegalIp],
            Section::Captable => &[
                CaptableOverview,
                CaptableShareholders,
                CaptableGrants,
                CaptableScenarios,
            ],
            Section::Marketing => &[
                MarketingOverview,
                MarketingCampaigns,
                MarketingContent,
                MarketingAnalytics,
            ],
            Section::Sales => &[SalesDashboard, SalesLeads, SalesDeals, SalesContacts, SalesPipeline],
            Section::Hr => &[HrEmployees, HrRecruiting, HrPayroll, HrTimeOff],
            Section::Myorgs => &[MyorgsOrganizations, MyorgsMembers, MyorgsInvitations],
            Section::Dashboard | Section::Marketplace => &[],
        }
    }

    pub fn default_sub_section(self) -> Option<SubSection> {
        self.sub_sections().first().copied()
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Section {
    type Err = LayrbaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.id() == s)
            .ok_or_else(|| LayrbaseError::validation(format!("unknown section: {s}")))
    }
}

/// A sub-section, always belonging to exactly one [`Section`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubSection {
    CompanyOverview,
    CompanyProfile,
    CompanyBranding,
    CompanyDocuments,
    FinanceOverview,
    FinanceTransactions,
    FinanceInvoices,
    FinanceBudgets,
    FinanceReports,
    LegalCompliance,
    LegalContracts,
    LegalDocuments,
    LegalIp,
    CaptableOverview,
    CaptableShareholders,
    CaptableGrants,
    CaptableScenarios,
    MarketingOverview,
    MarketingCampaigns,
    MarketingContent,
    MarketingAnalytics,
    SalesDashboard,
    SalesLeads,
    SalesDeals,
    SalesContacts,
    SalesPipeline,
    HrEmployees,
    HrRecruiting,
    HrPayroll,
    HrTimeOff,
    MyorgsOrganizations,
    MyorgsMembers,
    MyorgsInvitations,
}

impl SubSection {
    pub fn section(self) -> Section {
        use SubSection::*;
        match self {
            CompanyOverview | CompanyProfile | CompanyBranding | CompanyDocuments => Section::Company,
            FinanceOverview | FinanceTransactions | FinanceInvoices | FinanceBudgets
            | FinanceReports => Section::Finance,
            LegalCompliance | LegalContracts | LegalDocuments | LegalIp => Section::Legal,
            CaptableOverview | CaptableShareholders | CaptableGrants | CaptableScenarios => {
                Section::Captable
            }
            MarketingOverview | MarketingCampaigns | MarketingContent | MarketingAnalytics => {
                Section::Marketing
            }
            SalesDashboard | SalesLeads | SalesDeals | SalesContacts | SalesPipeline => {
                Section::Sales
            }
            HrEmployees | HrRecruiting | HrPayroll | HrTimeOff => Section::Hr,
            MyorgsOrganizations | MyorgsMembers | MyorgsInvitations => Section::Myorgs,
        }
    }

    /// Id within the owning section (e.g. `time-off`).
    pub fn id(self) -> &'static str {
        use SubSection::*;
        match self {
            CompanyOverview | FinanceOverview | CaptableOverview | MarketingOverview => "overview",
            CompanyProfile => "profile",
            CompanyBranding => "branding",
            CompanyDocuments | LegalDocuments => "documents",
            FinanceTransactions => "transactions",
            FinanceInvoices => "invoices",
            FinanceBudgets => "budgets",
            FinanceReports => "reports",
            LegalCompliance => "compliance",
            LegalContracts => "contracts",
            LegalIp => "ip",
            CaptableShareholders => "shareholders",
            CaptableGrants => "grants",
            CaptableScenarios => "scenarios",
            MarketingCampaigns => "campaigns",
            MarketingContent => "content",
            MarketingAnalytics => "analytics",
            SalesDashboard => "dashboard",
            SalesLeads => "leads",
            SalesDeals => "deals",
            SalesContacts => "contacts",
            SalesPipeline => "pipeline",
            HrEmployees => "employees",
            HrRecruiting => "recruiting",
            HrPayroll => "payroll",
            HrTimeOff => "time-off",
            MyorgsOrganizations => "organizations",
            MyorgsMembers => "members",
            MyorgsInvitations => "invitations",
        }
    }

    /// Look up a sub-section by its id within `section`.
    pub fn parse(section: Section, id: &str) -> Result<Self, LayrbaseError> {
        section
            .sub_sections()
            .iter()
            .copied()
            .find(|sub| sub.id() == id)
            .ok_or_else(|| {
                LayrbaseError::validation(format!("unknown sub-section {id} in {section}"))
            })
    }
}

impl fmt::Display for SubSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.section(), self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum NavAction {
    ChangeSection(Section),
    ChangeSubSection(SubSection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    active: Section,
    remembered: HashMap<Section, SubSection>,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            active: Section::Dashboard,
            remembered: HashMap::new(),
        }
    }
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the state reached by applying `actions` from the start.
    pub fn replay(actions: impl IntoIterator<Item = NavAction>) -> Self {
        let mut state = Self::new();
        for action in actions {
            state.apply(action);
        }
        state
    }

    pub fn apply(&mut self, action: NavAction) {
        match action {
            NavAction::ChangeSection(section) => self.change_section(section),
            NavAction::ChangeSubSection(sub) => self.change_sub_section(sub),
        }
    }

    pub fn change_section(&mut self, section: Section) {
        self.active = section;
        if let Some(default) = section.default_sub_section() {
            self.remembered.entry(section).or_insert(default);
        }
    }

    pub fn change_sub_section(&mut self, sub: SubSection) {
        let owner = sub.section();
        if self.active != owner {
            self.change_section(owner);
        }
        self.remembered.insert(owner, sub);
    }

    pub fn section(&self) -> Section {
        self.active
    }

    /// Visible sub-section of the active section, `None` for sections
    /// without any.
    pub fn sub_section(&self) -> Option<SubSection> {
        self.remembered.get(&self.active).copied()
    }

    pub fn location(&self) -> (Section, Option<SubSection>) {
        (self.section(), self.sub_section())
    }
}
