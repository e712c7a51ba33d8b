// Cache key and tag naming shared by services and the invalidator

pub const BLOG_PREFIX: &str = "blog:";
pub const PORTFOLIO_PREFIX: &str = "portfolio:";
pub const CATEGORIES_PREFIX: &str = "categories:";
pub const TECHNOLOGIES_PREFIX: &str = "technologies:";
pub const SETTINGS_PREFIX: &str = "settings:";

pub const SETTINGS_ALL: &str = "settings:all";
pub const TECHNOLOGIES_ALL: &str = "technologies:all";
pub const PORTFOLIO_CATEGORIES: &str = "portfolio:categories";

pub const TAG_BLOG: &str = "blog";
pub const TAG_PORTFOLIO: &str = "portfolio";
pub const TAG_SETTINGS: &str = "settings";

pub fn path_tag(path: &str) -> String {
    format!("path:{path}")
}

pub fn blog_list(page: u32, limit: u32, category: Option<&str>, search: Option<&str>) -> String {
    format!(
        "blog:list:{page}:{limit}:{}:{}",
        category.unwrap_or(""),
        search.unwrap_or("")
    )
}

pub fn blog_post(slug: &str) -> String {
    format!("blog:post:{slug}")
}

pub fn portfolio_list(category: Option<&str>, featured: Option<bool>) -> String {
    let featured = match featured {
        Some(true) => "1",
        Some(false) => "0",
        None => "",
    };
    format!("portfolio:list:{}:{featured}", category.unwrap_or(""))
}

pub fn portfolio_item(slug: &str) -> String {
    format!("portfolio:item:{slug}")
}

pub fn technologies(category: Option<&str>) -> String {
    match category {
        Some(category) => format!("technologies:{category}"),
        None => TECHNOLOGIES_ALL.to_string(),
    }
}

pub fn categories(kind: Option<&str>) -> String {
    format!("categories:{}", kind.unwrap_or("all"))
}
