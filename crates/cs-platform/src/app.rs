//! Application Wiring
//!
//! Builds repositories, services and the `/api/v1` router from a database
//! handle and the loaded configuration. The server binary and the
//! integration tests both start from [`Platform::new`].

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use cs_common::ServiceInfo;
use mongodb::Database;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::activity::api::{activity_admin_router, ActivityState};
use crate::activity::{ActivityRepository, ActivityService};
use crate::analytics::api::{analytics_admin_router, analytics_router, AnalyticsState};
use crate::analytics::{AnalyticsRepository, AnalyticsService};
use crate::auth::auth_api::{auth_router, AuthState};
use crate::auth::{AccountService, AuthService, LogNotifier, Notifier, PasswordPolicy, PasswordService};
use crate::banner::api::{banners_admin_router, banners_router, BannerState};
use crate::banner::{BannerRepository, BannerService};
use crate::careers::api::{careers_admin_router, careers_router, CareersState};
use crate::careers::{CareersService, JobApplicationRepository, JobPostingRepository};
use crate::consultation::api::{consultations_admin_router, consultations_router, ConsultationState};
use crate::consultation::{ConsultationRepository, ConsultationService};
use crate::contact::api::{contact_admin_router, contact_router, ContactState};
use crate::contact::{ContactRepository, ContactService};
use crate::dashboard::api::{dashboard_admin_router, DashboardState};
use crate::dashboard::DashboardService;
use crate::floor_plan::api::{floor_plans_admin_router, FloorPlansState};
use crate::floor_plan::{FloorPlanRepository, FloorPlanService};
use crate::ginseng::api::{ginseng_admin_router, ginseng_router, GinsengState};
use crate::ginseng::{CategoryRepository, GinsengService, OriginRepository, ProductRepository};
use crate::news::api::{news_admin_router, news_router, NewsState};
use crate::news::{NewsArticleRepository, NewsCategoryRepository, NewsService};
use crate::newsletter::api::{newsletter_admin_router, newsletter_router, NewsletterState};
use crate::newsletter::{NewsletterRepository, NewsletterService};
use crate::project::api::{projects_admin_router, projects_router, ProjectsState};
use crate::project::{ProjectRepository, ProjectService};
use crate::role::api::{permissions_admin_router, roles_admin_router, RolesState};
use crate::role::{PermissionRepository, RoleRepository, RoleService};
use crate::seed::Seeder;
use crate::setting::api::{settings_admin_router, settings_router, SettingState};
use crate::setting::{SettingRepository, SettingService};
use crate::shared::authorization_service::AuthorizationService;
use crate::shared::error::Result;
use crate::shared::health_api::{health_router, HealthState};
use crate::shared::middleware::{AppState, AuthLayer};
use crate::upload::api::{uploads_admin_router, uploads_router, UploadsState};
use crate::upload::{BlobStore, FileUploadRepository, UploadLimits, UploadService};
use crate::user::api::{users_admin_router, UsersState};
use crate::user::{UserRepository, UserService};

/// Every service the HTTP surface needs, built once at start-up.
#[derive(Clone)]
pub struct Platform {
    db: Database,
    app_state: AppState,
    body_limit: usize,
    accounts: AccountService,
    users: UserService,
    roles: RoleService,
    activity: ActivityService,
    uploads: UploadService,
    projects: ProjectService,
    floor_plans: FloorPlanService,
    ginseng: GinsengService,
    news: NewsService,
    contacts: ContactService,
    consultations: ConsultationService,
    newsletter: NewsletterService,
    careers: CareersService,
    banners: BannerService,
    settings: SettingService,
    analytics: AnalyticsService,
    seeder: Arc<Seeder>,
}

impl Platform {
    pub fn new(db: &Database, config: &cs_config::AppConfig, blob_store: Arc<dyn BlobStore>) -> Result<Self> {
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
        Self::with_notifier(db, config, blob_store, notifier)
    }

    pub fn with_notifier(
        db: &Database,
        config: &cs_config::AppConfig,
        blob_store: Arc<dyn BlobStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let user_repo = Arc::new(UserRepository::new(db));
        let role_repo = Arc::new(RoleRepository::new(db));
        let permission_repo = Arc::new(PermissionRepository::new(db));
        let activity_repo = Arc::new(ActivityRepository::new(db));
        let upload_repo = Arc::new(FileUploadRepository::new(db));
        let project_repo = Arc::new(ProjectRepository::new(db));
        let floor_plan_repo = Arc::new(FloorPlanRepository::new(db));
        let category_repo = Arc::new(CategoryRepository::new(db));
        let origin_repo = Arc::new(OriginRepository::new(db));
        let product_repo = Arc::new(ProductRepository::new(db));
        let news_category_repo = Arc::new(NewsCategoryRepository::new(db));
        let article_repo = Arc::new(NewsArticleRepository::new(db));
        let contact_repo = Arc::new(ContactRepository::new(db));
        let consultation_repo = Arc::new(ConsultationRepository::new(db));
        let newsletter_repo = Arc::new(NewsletterRepository::new(db));
        let job_repo = Arc::new(JobPostingRepository::new(db));
        let application_repo = Arc::new(JobApplicationRepository::new(db));
        let banner_repo = Arc::new(BannerRepository::new(db));
        let setting_repo = Arc::new(SettingRepository::new(db));
        let analytics_repo = Arc::new(AnalyticsRepository::new(db));

        let auth_service = Arc::new(AuthService::new(config.auth.clone()));
        let authz_service = Arc::new(AuthorizationService::new(
            user_repo.clone(),
            role_repo.clone(),
            config.auth.admin_roles.clone(),
        ));
        let passwords = Arc::new(PasswordService::new(&config.auth.argon2, PasswordPolicy::default())?);
        let activity = ActivityService::new(activity_repo);

        let uploads = UploadService::new(
            upload_repo,
            blob_store,
            UploadLimits::from_config(&config.storage),
            activity.clone(),
        );

        Ok(Self {
            db: db.clone(),
            app_state: AppState {
                auth_service: auth_service.clone(),
                authz_service,
            },
            body_limit: usize::try_from(config.http.body_limit_bytes).unwrap_or(usize::MAX),
            accounts: AccountService::new(
                user_repo.clone(),
                auth_service,
                passwords.clone(),
                notifier,
                activity.clone(),
                config.site.public_base_url.clone(),
            ),
            users: UserService::new(user_repo.clone(), role_repo.clone(), passwords.clone(), activity.clone()),
            roles: RoleService::new(role_repo.clone(), permission_repo.clone(), user_repo.clone(), activity.clone()),
            projects: ProjectService::new(project_repo.clone(), floor_plan_repo.clone(), uploads.clone(), activity.clone()),
            floor_plans: FloorPlanService::new(floor_plan_repo, project_repo, activity.clone()),
            ginseng: GinsengService::new(category_repo, origin_repo, product_repo, activity.clone()),
            news: NewsService::new(news_category_repo, article_repo, activity.clone()),
            contacts: ContactService::new(contact_repo, user_repo.clone(), activity.clone()),
            consultations: ConsultationService::new(consultation_repo, user_repo.clone(), activity.clone()),
            newsletter: NewsletterService::new(newsletter_repo, activity.clone()),
            careers: CareersService::new(job_repo, application_repo, activity.clone()),
            banners: BannerService::new(banner_repo, activity.clone()),
            settings: SettingService::new(setting_repo, activity.clone()),
            analytics: AnalyticsService::new(analytics_repo),
            seeder: Arc::new(Seeder::new(user_repo, role_repo, permission_repo, passwords)),
            uploads,
            activity,
        })
    }

    pub fn seeder(&self) -> &Seeder {
        &self.seeder
    }

    fn dashboard(&self) -> DashboardService {
        DashboardService {
            projects: self.projects.clone(),
            ginseng: self.ginseng.clone(),
            news: self.news.clone(),
            contacts: self.contacts.clone(),
            consultations: self.consultations.clone(),
            newsletter: self.newsletter.clone(),
            careers: self.careers.clone(),
            users: self.users.clone(),
            banners: self.banners.clone(),
            uploads: self.uploads.clone(),
            analytics: self.analytics.clone(),
            activity: self.activity.clone(),
        }
    }

    fn admin_router(&self) -> Router {
        let projects_state = ProjectsState {
            projects: self.projects.clone(),
            floor_plans: self.floor_plans.clone(),
        };
        let upload_limit = self.uploads.limits().request_limit();
        let roles_state = RolesState { roles: self.roles.clone() };

        Router::new()
            .nest("/users", users_admin_router(UsersState { users: self.users.clone() }))
            .nest("/roles", roles_admin_router(roles_state.clone()))
            .nest("/permissions", permissions_admin_router(roles_state))
            .nest("/projects", projects_admin_router(projects_state, upload_limit))
            .nest("/floor-plans", floor_plans_admin_router(FloorPlansState { floor_plans: self.floor_plans.clone() }))
            .nest("/ginseng", ginseng_admin_router(GinsengState { ginseng: self.ginseng.clone() }))
            .nest("/news", news_admin_router(NewsState { news: self.news.clone() }))
            .nest("/contacts", contact_admin_router(ContactState { contacts: self.contacts.clone() }))
            .nest(
                "/consultations",
                consultations_admin_router(ConsultationState { consultations: self.consultations.clone() }),
            )
            .nest("/newsletter", newsletter_admin_router(NewsletterState { newsletter: self.newsletter.clone() }))
            .nest("/careers", careers_admin_router(CareersState { careers: self.careers.clone() }))
            .nest("/banners", banners_admin_router(BannerState { banners: self.banners.clone() }))
            .nest("/settings", settings_admin_router(SettingState { settings: self.settings.clone() }))
            .nest("/uploads", uploads_admin_router(UploadsState { uploads: self.uploads.clone() }))
            .nest("/activity", activity_admin_router(ActivityState { activity: self.activity.clone() }))
            .nest("/analytics", analytics_admin_router(AnalyticsState { analytics: self.analytics.clone() }))
            .nest("/dashboard", dashboard_admin_router(DashboardState { dashboard: self.dashboard() }))
    }

    /// Full HTTP surface: `/api/v1/...` plus Swagger UI for the auth API.
    pub fn router(&self, service: ServiceInfo) -> Router {
        let (auth, mut openapi) = OpenApiRouter::new()
            .nest("/api/v1/auth", auth_router(AuthState { accounts: self.accounts.clone() }))
            .split_for_parts();
        openapi.info.title = "CorpSite API".to_string();
        openapi.info.description = Some("Corporate website backend".to_string());

        let public = Router::new()
            .nest("/health", health_router(HealthState::new(Some(self.db.clone()), service)))
            .nest(
                "/projects",
                projects_router(ProjectsState {
                    projects: self.projects.clone(),
                    floor_plans: self.floor_plans.clone(),
                }),
            )
            .nest("/ginseng", ginseng_router(GinsengState { ginseng: self.ginseng.clone() }))
            .nest("/news", news_router(NewsState { news: self.news.clone() }))
            .nest("/contact", contact_router(ContactState { contacts: self.contacts.clone() }))
            .nest(
                "/consultations",
                consultations_router(ConsultationState { consultations: self.consultations.clone() }),
            )
            .nest("/newsletter", newsletter_router(NewsletterState { newsletter: self.newsletter.clone() }))
            .nest("/careers", careers_router(CareersState { careers: self.careers.clone() }))
            .nest("/banners", banners_router(BannerState { banners: self.banners.clone() }))
            .nest("/settings", settings_router(SettingState { settings: self.settings.clone() }))
            .nest("/uploads", uploads_router(UploadsState { uploads: self.uploads.clone() }))
            .nest("/analytics", analytics_router(AnalyticsState { analytics: self.analytics.clone() }))
            .nest("/admin", self.admin_router());

        Router::new()
            .merge(auth)
            .nest("/api/v1", public)
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(DefaultBodyLimit::max(self.body_limit))
            .layer(AuthLayer::new(self.app_state.clone()))
    }
}
