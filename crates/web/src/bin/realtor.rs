//! One-invocation entry point: reads a single raw HTTP request from
//! stdin, dispatches it through the application and writes the response
//! to stdout.

use realtor_http::connection::WriteChannel;
use realtor_web::application::Application;
use realtor_web::auth::SessionAuth;
use realtor_web::config::Config;
use realtor_web::controllers::{PropertiesController, UsersController};
use realtor_web::entities::{Property, User};
use realtor_web::environment::Environment;
use realtor_web::factory::ServerRequestFactory;
use realtor_web::repository::JsonFileStore;
use realtor_web::router::{RouterError, fragment};
use std::cell::RefCell;
use std::io::{self, Read};
use std::process::ExitCode;
use std::rc::Rc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> ExitCode {
    // Initialize logging
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = Config::from_env();
    if let Err(cause) =
        std::fs::create_dir_all(&config.data_dir).and_then(|()| std::fs::create_dir_all(&config.image_dir))
    {
        error!(%cause, "failed to prepare data directories");
        return ExitCode::FAILURE;
    }

    let users = match JsonFileStore::<User>::open(config.users_path()) {
        Ok(store) => Rc::new(RefCell::new(store)),
        Err(cause) => {
            error!(%cause, "failed to open users store");
            return ExitCode::FAILURE;
        }
    };

    let properties = match JsonFileStore::<Property>::open(config.properties_path()) {
        Ok(store) => Rc::new(RefCell::new(store)),
        Err(cause) => {
            error!(%cause, "failed to open properties store");
            return ExitCode::FAILURE;
        }
    };

    let auth = Rc::new(RefCell::new(SessionAuth::new(users.clone())));

    let mut raw = Vec::new();
    if let Err(cause) = io::stdin().read_to_end(&mut raw) {
        error!(%cause, "failed to read request from stdin");
        return ExitCode::FAILURE;
    }

    let environment = match Environment::from_raw(&raw) {
        Ok(environment) => environment,
        Err(cause) => {
            error!(%cause, "unusable inbound request");
            return ExitCode::FAILURE;
        }
    };

    let request = match ServerRequestFactory::from_env(&environment) {
        Ok(request) => request,
        Err(cause) => {
            error!(%cause, "failed to build server request");
            return ExitCode::FAILURE;
        }
    };

    info!(method = %request.method(), path = request.uri().path(), "dispatching");

    let mut app = Application::new(request);

    app.register_controller("users", {
        let users = users.clone();
        let auth = auth.clone();
        move |request, response| Box::new(UsersController::new(request, response, users.clone(), auth.clone()))
    });

    app.register_controller("properties", {
        let properties = properties.clone();
        let auth = auth.clone();
        let config = config.clone();
        move |request, response| {
            Box::new(PropertiesController::new(request, response, properties.clone(), auth.clone(), config.clone()))
        }
    });

    if let Err(cause) = register_routes(&mut app) {
        error!(%cause, "failed to register routes");
        return ExitCode::FAILURE;
    }

    let mut output = WriteChannel::new(io::stdout().lock());
    match app.run(&mut output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(cause) => {
            error!(%cause, "failed to write response");
            ExitCode::FAILURE
        }
    }
}

fn register_routes(app: &mut Application) -> Result<(), RouterError> {
    const EMAIL: &str = r"[^/]+@[^/]+\.[^/]+";

    app.register_route("POST", r"^/app/signin/$", "users", "sign_in")?;
    app.register_route("POST", r"^/app/signout/$", "users", "sign_out")?;

    app.register_route("GET", r"^/app/users/$", "users", "get_users")?;
    app.register_route("GET", &format!(r"^/app/users/(?P<id>{EMAIL})/$"), "users", "get_user")?;
    app.register_route("POST", r"^/app/users/$", "users", "create_user")?;
    app.register_route("POST", &format!(r"^/app/users/update/(?P<id>{EMAIL})/$"), "users", "update_user")?;
    app.register_route("POST", &format!(r"^/app/users/delete/(?P<id>{EMAIL})/$"), "users", "delete_user")?;

    let uniq = fragment::UNIQ;
    app.register_route("GET", &format!(r"^/app/properties/(?P<id>{uniq})/$"), "properties", "get_property")?;
    app.register_route("GET", r"^/app/properties/$", "properties", "get_properties")?;
    app.register_route("POST", r"^/app/properties/$", "properties", "create_property")?;
    app.register_route("POST", &format!(r"^/app/properties/update/(?P<id>{uniq})/$"), "properties", "update_property")?;
    app.register_route("POST", &format!(r"^/app/properties/delete/(?P<id>{uniq})/$"), "properties", "delete_property")?;

    Ok(())
}
