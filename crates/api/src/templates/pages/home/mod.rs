use maud::{html, Markup};

use crate::templates::layouts::{base, PageConfig};

pub struct ApiRoute {
    pub path: &'static str,
    pub description: &'static str,
}

/// JSON routes advertised on the index page, in the order they are listed
pub const API_ROUTES: [ApiRoute; 5] = [
    ApiRoute {
        path: "/api/v1.0/precip",
        description: "Precipitation for the last year of data, one {date: prcp} entry per reading",
    },
    ApiRoute {
        path: "/api/v1.0/stations",
        description: "Every weather station in the dataset",
    },
    ApiRoute {
        path: "/api/v1.0/tobs",
        description: "Temperature observations of the most active station for the last year of data",
    },
    ApiRoute {
        path: "/api/v1.0/{start}",
        description: "Min, max and average temperature from start (YYYY-MM-DD) to the end of the dataset",
    },
    ApiRoute {
        path: "/api/v1.0/{start}/{end}",
        description: "Min, max and average temperature between start and end (YYYY-MM-DD), inclusive",
    },
];

pub fn home_page(api_base: &str) -> Markup {
    let config = PageConfig {
        title: "Climate API",
        api_base,
    };

    base(&config, content())
}

fn content() -> Markup {
    html! {
        div class="content" {
            p { "Available Routes:" }
            ul id="routes" {
                @for route in &API_ROUTES {
                    li {
                        code { (route.path) }
                        " - "
                        (route.description)
                    }
                }
            }
        }
    }
}
