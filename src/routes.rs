use std::fmt;

use crate::auth::SessionView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardPage {
    Overview,
    Listings,
    NewListing,
    EditListing(String),
    Orders,
    Sales,
    Wishlist,
    Blogs,
    NewBlog,
    Complaints,
    Profile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminPage {
    Overview,
    Listings,
    Orphans,
    Users,
    Blogs,
    Complaints,
    Commission,
}

/// Client-side routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Products,
    Product(String),
    SignIn,
    Register,
    Blogs,
    Blog(String),
    Dashboard(DashboardPage),
    Admin(AdminPage),
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Sign-in and register; signed-in users are sent to the dashboard.
    Guest,
    Member,
    Admin,
}

impl Route {
    /// Parses a path; query strings and trailing slashes are ignored.
    pub fn parse(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Home,
            ["products"] => Route::Products,
            ["products", id] => Route::Product(id.to_string()),
            ["signin"] => Route::SignIn,
            ["register"] => Route::Register,
            ["blogs"] => Route::Blogs,
            ["blogs", id] => Route::Blog(id.to_string()),
            ["dashboard", rest @ ..] => Self::dashboard(rest).map_or(Route::NotFound, Route::Dashboard),
            ["admin", rest @ ..] => Self::admin(rest).map_or(Route::NotFound, Route::Admin),
            _ => Route::NotFound,
        }
    }

    fn dashboard(rest: &[&str]) -> Option<DashboardPage> {
        Some(match rest {
            [] => DashboardPage::Overview,
            ["listings"] => DashboardPage::Listings,
            ["listings", "new"] => DashboardPage::NewListing,
            ["listings", id, "edit"] => DashboardPage::EditListing(id.to_string()),
            ["orders"] => DashboardPage::Orders,
            ["sales"] => DashboardPage::Sales,
            ["wishlist"] => DashboardPage::Wishlist,
            ["blogs"] => DashboardPage::Blogs,
            ["blogs", "new"] => DashboardPage::NewBlog,
            ["complaints"] => DashboardPage::Complaints,
            ["profile"] => DashboardPage::Profile,
            _ => return None,
        })
    }

    fn admin(rest: &[&str]) -> Option<AdminPage> {
        Some(match rest {
            [] => AdminPage::Overview,
            ["listings"] => AdminPage::Listings,
            ["listings", "orphans"] => AdminPage::Orphans,
            ["users"] => AdminPage::Users,
            ["blogs"] => AdminPage::Blogs,
            ["complaints"] => AdminPage::Complaints,
            ["commission"] => AdminPage::Commission,
            _ => return None,
        })
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".into(),
            Route::Products => "/products".into(),
            Route::Product(id) => format!("/products/{}", id),
            Route::SignIn => "/signin".into(),
            Route::Register => "/register".into(),
            Route::Blogs => "/blogs".into(),
            Route::Blog(id) => format!("/blogs/{}", id),
            Route::Dashboard(page) => match page {
                DashboardPage::Overview => "/dashboard".into(),
                DashboardPage::Listings => "/dashboard/listings".into(),
                DashboardPage::NewListing => "/dashboard/listings/new".into(),
                DashboardPage::EditListing(id) => format!("/dashboard/listings/{}/edit", id),
                DashboardPage::Orders => "/dashboard/orders".into(),
                DashboardPage::Sales => "/dashboard/sales".into(),
                DashboardPage::Wishlist => "/dashboard/wishlist".into(),
                DashboardPage::Blogs => "/dashboard/blogs".into(),
                DashboardPage::NewBlog => "/dashboard/blogs/new".into(),
                DashboardPage::Complaints => "/dashboard/complaints".into(),
                DashboardPage::Profile => "/dashboard/profile".into(),
            },
            Route::Admin(page) => match page {
                AdminPage::Overview => "/admin".into(),
                AdminPage::Listings => "/admin/listings".into(),
                AdminPage::Orphans => "/admin/listings/orphans".into(),
                AdminPage::Users => "/admin/users".into(),
                AdminPage::Blogs => "/admin/blogs".into(),
                AdminPage::Complaints => "/admin/complaints".into(),
                AdminPage::Commission => "/admin/commission".into(),
            },
            Route::NotFound => "/404".into(),
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::SignIn | Route::Register => Access::Guest,
            Route::Dashboard(_) => Access::Member,
            Route::Admin(_) => Access::Admin,
            _ => Access::Public,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Allow,
    /// Session restore still running; render nothing yet.
    Wait,
    Redirect(Route),
}

pub fn guard(route: &Route, session: &SessionView) -> Guard {
    if session.is_loading() {
        return Guard::Wait;
    }
    let signed_in = session.is_authenticated();
    match route.access() {
        Access::Public => Guard::Allow,
        Access::Guest if signed_in => Guard::Redirect(Route::Dashboard(DashboardPage::Overview)),
        Access::Guest => Guard::Allow,
        Access::Member if signed_in => Guard::Allow,
        Access::Member => Guard::Redirect(Route::SignIn),
        Access::Admin => match session.current_user() {
            Some(user) if user.is_admin() => Guard::Allow,
            Some(_) => Guard::Redirect(Route::Home),
            None => Guard::Redirect(Route::SignIn),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Role, SessionHandle};
    use crate::settings::Settings;
    use crate::testkit;

    #[test]
    fn parse_and_path_agree() {
        for path in [
            "/",
            "/products",
            "/products/p1",
            "/signin",
            "/blogs/b9",
            "/dashboard",
            "/dashboard/listings/p1/edit",
            "/dashboard/blogs/new",
            "/admin/listings/orphans",
            "/admin/commission",
        ] {
            assert_eq!(Route::parse(path).path(), path);
        }
    }

    #[test]
    fn parse_ignores_query_and_trailing_slash() {
        assert_eq!(Route::parse("/products/?page=2"), Route::Products);
        assert_eq!(Route::parse("/admin/users/"), Route::Admin(AdminPage::Users));
        assert_eq!(Route::parse("/admin/nope"), Route::NotFound);
        assert_eq!(Route::parse("/elsewhere"), Route::NotFound);
    }

    #[test]
    fn loading_session_waits_everywhere() {
        let handle = SessionHandle::new(Settings::in_memory());
        assert_eq!(guard(&Route::Products, &handle.view()), Guard::Wait);
        assert_eq!(guard(&Route::Admin(AdminPage::Users), &handle.view()), Guard::Wait);
    }

    #[test]
    fn anonymous_users_are_sent_to_sign_in() {
        let handle = SessionHandle::new(Settings::in_memory());
        handle.clear();
        let view = handle.view();
        assert_eq!(guard(&Route::Products, &view), Guard::Allow);
        assert_eq!(guard(&Route::SignIn, &view), Guard::Allow);
        assert_eq!(
            guard(&Route::Dashboard(DashboardPage::Orders), &view),
            Guard::Redirect(Route::SignIn)
        );
        assert_eq!(
            guard(&Route::Admin(AdminPage::Overview), &view),
            Guard::Redirect(Route::SignIn)
        );
    }

    #[test]
    fn role_gates_admin_pages() {
        let handle = SessionHandle::new(Settings::in_memory());
        handle.authenticate(Some("t"), testkit::user("u1", "user@test.com"));
        let view = handle.view();
        assert_eq!(guard(&Route::Dashboard(DashboardPage::Profile), &view), Guard::Allow);
        assert_eq!(
            guard(&Route::Admin(AdminPage::Listings), &view),
            Guard::Redirect(Route::Home)
        );
        assert_eq!(
            guard(&Route::SignIn, &view),
            Guard::Redirect(Route::Dashboard(DashboardPage::Overview))
        );

        let mut admin = testkit::user("a1", "admin@test.com");
        admin.role = Role::Admin;
        handle.replace_user(admin);
        assert_eq!(guard(&Route::Admin(AdminPage::Listings), &view), Guard::Allow);
    }
}
