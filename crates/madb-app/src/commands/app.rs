//! App lifecycle commands: `start`, `stop`, `clear-data`, `uninstall`, `install`
//!
//! The app id and activity come from the command line when given. Otherwise
//! they are read from the Gradle project in the working directory (once,
//! before fanning out), and Flutter projects are handed to `flutter`.

use std::sync::Arc;

use madb_core::prelude::*;
use madb_core::{select_best_output, Device, VariantProperties};
use madb_daemon::{
    flutter_available, screen_density, supported_abis, AdbTool,
    DeviceAction, DeviceCommand, OutputOptions,
};

use super::CommandContext;
use crate::build::{
    extract_properties, is_flutter_project, is_gradle_project, run_assemble, PropertyCache,
    VariantKey,
};

const FLUTTER: &str = "flutter";

/// Flags that pick the Gradle module/variant and control property extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectOptions {
    /// `--module`: sub-module of a multi-module project
    pub module: String,
    /// `--variant`: build variant, e.g. "debug"
    pub variant: String,
    /// `--clear-cache`: re-extract instead of using cached properties
    pub clear_cache: bool,
    /// `--build`: run the assemble task before installing
    pub build: bool,
}

/// Where the app to act on is taken from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppTarget {
    /// Ids given on the command line or extracted from Gradle
    Ids {
        app_id: String,
        activity: Option<String>,
    },
    /// A Flutter project; `flutter` knows the app by itself
    Flutter,
}

/// Outcome of checking the positional arguments, before any device I/O
#[derive(Debug, Clone, PartialEq, Eq)]
enum ArgSource {
    Explicit(Vec<String>),
    Gradle,
    Flutter,
}

/// Validate the positional argument count
///
/// Either exactly `required` arguments or none. With none, the working
/// directory must be a Gradle project (or a Flutter project when the command
/// supports Flutter).
fn classify_args(
    ctx: &CommandContext,
    args: &[String],
    required: usize,
    flutter_passthrough: bool,
) -> Result<ArgSource> {
    if args.len() == required {
        return Ok(ArgSource::Explicit(args.to_vec()));
    }
    if flutter_passthrough && is_flutter_project(ctx.work_dir()) {
        return Ok(ArgSource::Flutter);
    }
    if !args.is_empty() {
        let expected = if required == 1 {
            "one argument"
        } else {
            "two arguments"
        };
        return Err(Error::usage(format!(
            "You must provide either zero arguments or exactly {expected}."
        )));
    }
    if is_gradle_project(ctx.work_dir()) {
        return Ok(ArgSource::Gradle);
    }
    Err(Error::usage(
        "No arguments are provided and failed to extract the id from the build scripts.",
    ))
}

/// Cached or freshly extracted properties of the selected variant
pub async fn load_properties(
    ctx: &CommandContext,
    project: &ProjectOptions,
) -> Result<VariantProperties> {
    let key = VariantKey::new(ctx.work_dir(), &project.module, &project.variant);
    let cache = PropertyCache::new(ctx.store.dir());

    if project.clear_cache {
        cache.remove(&key)?;
    } else if let Some(properties) = cache.get(&key)? {
        ctx.println(
            "NOTE: Cached properties are being used. Use '--clear-cache' flag to clear the cache \
             and extract the properties from Gradle scripts again.",
        )?;
        return Ok(properties);
    }

    ctx.println("Running Gradle to extract the variant properties...")?;
    let properties = extract_properties(&key, ctx.store.dir()).await?;
    cache
        .put(&key, &properties)
        .context("Could not write the variant properties to the cache file")?;

    Ok(properties)
}

async fn resolve_target(
    ctx: &CommandContext,
    source: ArgSource,
    project: &ProjectOptions,
    needs_activity: bool,
) -> Result<AppTarget> {
    match source {
        ArgSource::Flutter => Ok(AppTarget::Flutter),
        ArgSource::Explicit(mut args) => {
            let activity = if needs_activity { args.pop() } else { None };
            let app_id = args.into_iter().next().unwrap_or_default();
            Ok(AppTarget::Ids { app_id, activity })
        }
        ArgSource::Gradle => {
            let properties = load_properties(ctx, project).await?;
            let activity = if needs_activity {
                if properties.activity.is_empty() {
                    return Err(Error::build(
                        "Could not extract the main activity name from the build scripts.",
                    ));
                }
                Some(properties.activity)
            } else {
                None
            };
            Ok(AppTarget::Ids {
                app_id: properties.app_id,
                activity,
            })
        }
    }
}

/// Prefix an activity without a package with `.`, so Android resolves it
/// against the app id
pub fn qualify_activity(activity: &str) -> String {
    if activity.contains('.') {
        activity.to_string()
    } else {
        format!(".{activity}")
    }
}

/// One app command as run against a single device
#[derive(Debug, Clone, PartialEq, Eq)]
enum AppCommand {
    Start { app_id: String, activity: String },
    Stop { app_id: String },
    ClearData { app_id: String },
    Uninstall { app_id: String, keep_data: bool },
    FlutterRun,
    FlutterStop,
    FlutterInstall,
}

impl AppCommand {
    fn is_flutter(&self) -> bool {
        matches!(
            self,
            AppCommand::FlutterRun | AppCommand::FlutterStop | AppCommand::FlutterInstall
        )
    }

    fn command_for(&self, adb: &AdbTool, device: &Device) -> DeviceCommand {
        let adb_cmd = || adb.device_command(&device.serial);
        match self {
            AppCommand::Start { app_id, activity } => with_user(
                adb_cmd().args(["shell", "am", "start", "-S"]),
                device,
            )
            .arg("-n")
            .arg(format!("{app_id}/{}", qualify_activity(activity))),
            AppCommand::Stop { app_id } => {
                with_user(adb_cmd().args(["shell", "am", "force-stop"]), device).arg(app_id)
            }
            AppCommand::ClearData { app_id } => {
                with_user(adb_cmd().args(["shell", "pm", "clear"]), device).arg(app_id)
            }
            AppCommand::Uninstall { app_id, keep_data } => {
                let mut cmd = adb_cmd().arg("uninstall");
                if *keep_data {
                    cmd = cmd.arg("-k");
                }
                with_user(cmd, device).arg(app_id)
            }
            AppCommand::FlutterRun => {
                DeviceCommand::new(FLUTTER).args(["run", "--device-id", device.serial.as_str()])
            }
            AppCommand::FlutterStop => {
                DeviceCommand::new(FLUTTER).args(["stop", "--android-device-id", device.serial.as_str()])
            }
            AppCommand::FlutterInstall => {
                DeviceCommand::new(FLUTTER).args(["install", "--device-id", device.serial.as_str()])
            }
        }
    }
}

/// Append `--user <id>` when the device has a default user
fn with_user(cmd: DeviceCommand, device: &Device) -> DeviceCommand {
    match &device.user_id {
        Some(user) => cmd.args(["--user", user.as_str()]),
        None => cmd,
    }
}

#[derive(Debug)]
struct AppAction {
    adb: AdbTool,
    output: OutputOptions,
    command: AppCommand,
}

impl DeviceAction for AppAction {
    async fn run(&self, device: &Device) -> Result<()> {
        let prefix = self.output.prefix_for(device, !self.command.is_flutter());
        self.command
            .command_for(&self.adb, device)
            .run_prefixed(&prefix, &self.output.stdout, &self.output.stderr)
            .await
    }
}

/// Installs the best matching output of a variant on each device
#[derive(Debug)]
struct InstallAction {
    adb: AdbTool,
    output: OutputOptions,
    properties: Arc<VariantProperties>,
}

impl DeviceAction for InstallAction {
    async fn run(&self, device: &Device) -> Result<()> {
        let abis = supported_abis(&self.adb, device).await?;
        let density = screen_density(&self.adb, device).await?;

        let best = select_best_output(&self.properties.variant_outputs, &abis, density)
            .ok_or_else(|| Error::no_matching_output(device.display_name()))?;
        debug!(
            "Selected {} for {} (abis {:?}, density {})",
            best.name,
            device.display_name(),
            abis,
            density
        );

        let cmd = with_user(
            self.adb.device_command(&device.serial).args(["install", "-r"]),
            device,
        )
        .arg(&best.output_file_path);

        let prefix = self.output.prefix_for(device, true);
        cmd.run_prefixed(&prefix, &self.output.stdout, &self.output.stderr)
            .await
    }
}

fn ensure_flutter() -> Result<()> {
    if flutter_available() {
        Ok(())
    } else {
        Err(Error::build("Could not find the 'flutter' tool on PATH."))
    }
}

/// Shared flow of the commands that act on an already installed app
///
/// `flutter` is the command to run instead in a Flutter project; `None` means
/// the command needs an app id even there.
async fn run_app_command(
    ctx: &CommandContext,
    args: &[String],
    project: &ProjectOptions,
    needs_activity: bool,
    flutter: Option<AppCommand>,
    make: impl FnOnce(String, Option<String>) -> AppCommand,
) -> Result<()> {
    let required = if needs_activity { 2 } else { 1 };
    let source = classify_args(ctx, args, required, flutter.is_some())?;

    let devices = ctx.target_devices().await?;
    let command = match resolve_target(ctx, source, project, needs_activity).await? {
        AppTarget::Ids { app_id, activity } => make(app_id, activity),
        AppTarget::Flutter => {
            ensure_flutter()?;
            flutter.ok_or_else(|| Error::usage("This command is not supported for Flutter projects."))?
        }
    };

    let action = AppAction {
        adb: ctx.adb.clone(),
        output: ctx.output.clone(),
        command,
    };
    ctx.run_on(devices, action).await
}

/// `madb start [<app_id> <activity>]`
pub async fn start(ctx: &CommandContext, args: &[String], project: &ProjectOptions) -> Result<()> {
    run_app_command(
        ctx,
        args,
        project,
        true,
        Some(AppCommand::FlutterRun),
        |app_id, activity| AppCommand::Start {
            app_id,
            activity: activity.unwrap_or_default(),
        },
    )
    .await
}

/// `madb stop [<app_id>]`
pub async fn stop(ctx: &CommandContext, args: &[String], project: &ProjectOptions) -> Result<()> {
    run_app_command(
        ctx,
        args,
        project,
        false,
        Some(AppCommand::FlutterStop),
        |app_id, _| AppCommand::Stop { app_id },
    )
    .await
}

/// `madb clear-data [<app_id>]`
pub async fn clear_data(
    ctx: &CommandContext,
    args: &[String],
    project: &ProjectOptions,
) -> Result<()> {
    run_app_command(ctx, args, project, false, None, |app_id, _| {
        AppCommand::ClearData { app_id }
    })
    .await
}

/// `madb uninstall [<app_id>] [--keep-data]`
pub async fn uninstall(
    ctx: &CommandContext,
    args: &[String],
    project: &ProjectOptions,
    keep_data: bool,
) -> Result<()> {
    run_app_command(ctx, args, project, false, None, |app_id, _| {
        AppCommand::Uninstall { app_id, keep_data }
    })
    .await
}

/// `madb install [--build]`
pub async fn install(ctx: &CommandContext, project: &ProjectOptions) -> Result<()> {
    if is_gradle_project(ctx.work_dir()) {
        let devices = ctx.target_devices().await?;
        let properties = load_properties(ctx, project).await?;

        if project.build {
            if properties.assemble_task.is_empty() {
                return Err(Error::build("The build scripts do not name an assemble task."));
            }
            run_assemble(ctx.work_dir(), &properties.assemble_task)
                .await
                .map_err(|e| Error::build(format!("Failed to build the app: {e}")))?;
        }

        let action = InstallAction {
            adb: ctx.adb.clone(),
            output: ctx.output.clone(),
            properties: Arc::new(properties),
        };
        return ctx.run_on(devices, action).await;
    }

    if is_flutter_project(ctx.work_dir()) {
        ensure_flutter()?;
        let devices = ctx.target_devices().await?;
        let action = AppAction {
            adb: ctx.adb.clone(),
            output: ctx.output.clone(),
            command: AppCommand::FlutterInstall,
        };
        return ctx.run_on(devices, action).await;
    }

    Err(Error::usage(
        "Could not find the target app to be installed. Try running 'madb install' from a Gradle \
         or Flutter project directory.",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use madb_daemon::test_utils::{test_device, test_device_named};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_qualify_activity() {
        assert_eq!(qualify_activity("MainActivity"), ".MainActivity");
        assert_eq!(qualify_activity(".MainActivity"), ".MainActivity");
        assert_eq!(
            qualify_activity("com.example.app.MainActivity"),
            "com.example.app.MainActivity"
        );
    }

    #[test]
    fn test_app_command_lines() {
        let adb = AdbTool::at("adb");
        let plain = test_device("deviceid01", 1);
        let with_user_id = madb_core::Device {
            user_id: Some("10".to_string()),
            ..test_device_named("deviceid02", 2, "Tablet")
        };

        let start = AppCommand::Start {
            app_id: "com.example".to_string(),
            activity: "Main".to_string(),
        };
        assert_eq!(
            start.command_for(&adb, &plain).display(),
            "adb -s deviceid01 shell am start -S -n com.example/.Main"
        );
        assert_eq!(
            start.command_for(&adb, &with_user_id).display(),
            "adb -s deviceid02 shell am start -S --user 10 -n com.example/.Main"
        );

        let stop = AppCommand::Stop {
            app_id: "com.example".to_string(),
        };
        assert_eq!(
            stop.command_for(&adb, &with_user_id).display(),
            "adb -s deviceid02 shell am force-stop --user 10 com.example"
        );

        let clear = AppCommand::ClearData {
            app_id: "com.example".to_string(),
        };
        assert_eq!(
            clear.command_for(&adb, &plain).display(),
            "adb -s deviceid01 shell pm clear com.example"
        );

        let uninstall = AppCommand::Uninstall {
            app_id: "com.example".to_string(),
            keep_data: true,
        };
        assert_eq!(
            uninstall.command_for(&adb, &with_user_id).display(),
            "adb -s deviceid02 uninstall -k --user 10 com.example"
        );
    }

    #[test]
    fn test_flutter_command_lines() {
        let adb = AdbTool::at("adb");
        let device = test_device("deviceid01", 1);

        assert_eq!(
            AppCommand::FlutterRun.command_for(&adb, &device).display(),
            "flutter run --device-id deviceid01"
        );
        assert_eq!(
            AppCommand::FlutterStop.command_for(&adb, &device).display(),
            "flutter stop --android-device-id deviceid01"
        );
        assert_eq!(
            AppCommand::FlutterInstall.command_for(&adb, &device).display(),
            "flutter install --device-id deviceid01"
        );
        assert!(AppCommand::FlutterRun.is_flutter());
        assert!(!AppCommand::Stop {
            app_id: String::new()
        }
        .is_flutter());
    }

    #[cfg(unix)]
    mod with_fake_tools {
        use super::super::*;
        use super::strings;
        use crate::build::gradle::INIT_SCRIPT_FILENAME;
        use crate::commands::test_support::*;
        use serial_test::serial;
        use std::path::Path;
        use tempfile::tempdir;

        const PROPERTIES_JSON: &str = r#"{"appId":"com.example.app","activity":"MainActivity",
"abiFilters":[],"assembleTask":"assembleDebug","variantOutputs":[
{"name":"arm","outputFilePath":"/out/app-arm.apk","versionCode":2,
 "filters":[{"filterType":"ABI","identifier":"armeabi-v7a"}]},
{"name":"x86","outputFilePath":"/out/app-x86.apk","versionCode":2,
 "filters":[{"filterType":"ABI","identifier":"x86"}]}]}"#;

        const DEVICE_RESPONSES: &str = "case \"$*\" in\n\
            *emulator-5554*get-config*) echo 'abi: x86' ;;\n\
            *deviceid02*get-config*) echo 'abi: mips' ;;\n\
            *get-config*) echo 'abi: arm64-v8a,armeabi-v7a' ;;\n\
            *getprop*) echo '[ro.sf.lcd_density]: [420]' ;;\n\
            esac";

        /// Make `ctx.work_dir` a Gradle project whose wrapper writes
        /// `PROPERTIES_JSON` and logs its arguments to `gradle.log`
        fn gradle_project(ctx: &CommandContext) {
            let dir = ctx.work_dir();
            std::fs::write(dir.join("build.gradle"), "").unwrap();
            std::fs::create_dir_all(ctx.store.dir()).unwrap();
            std::fs::write(ctx.store.dir().join(INIT_SCRIPT_FILENAME), "").unwrap();

            let body = "echo \"$*\" >> '@LOG@'\n\
                        for arg in \"$@\"; do\n\
                        case \"$arg\" in -PmadbOutputFile=*) out=\"${arg#-PmadbOutputFile=}\" ;; esac\n\
                        done\n\
                        if [ -n \"$out\" ]; then\n\
                        cat > \"$out\" <<'EOF'\n@JSON@\nEOF\n\
                        fi\n"
                .replace("@LOG@", &dir.join("gradle.log").display().to_string())
                .replace("@JSON@", PROPERTIES_JSON);
            write_script(&dir.join("gradlew"), &body);
        }

        fn gradle_calls(ctx: &CommandContext) -> Vec<String> {
            std::fs::read_to_string(ctx.work_dir().join("gradle.log"))
                .unwrap_or_default()
                .lines()
                .map(String::from)
                .collect()
        }

        fn install_calls(dir: &Path) -> Vec<String> {
            logged_calls(dir)
                .into_iter()
                .filter(|call| call.contains(" install -r "))
                .collect()
        }

        #[tokio::test]
        async fn test_start_with_explicit_ids() {
            let temp = tempdir().unwrap();
            let (ctx, _) = context(temp.path(), fake_adb(temp.path(), ""));
            ctx.store.update(|cfg| cfg.set_user_id("deviceid01", "10")).unwrap();
            let ctx = ctx.with_filter(madb_core::DeviceFilter::from_tokens(["deviceid01", "@3"]));

            start(&ctx, &strings(&["com.example", "Main"]), &ProjectOptions::default())
                .await
                .unwrap();

            assert_eq!(
                logged_calls(temp.path()),
                vec![
                    "-s deviceid01 shell am start -S --user 10 -n com.example/.Main",
                    "-s emulator-5554 shell am start -S -n com.example/.Main",
                ]
            );
        }

        #[tokio::test]
        async fn test_wrong_argument_count_fails_before_device_io() {
            let temp = tempdir().unwrap();
            let (ctx, _) = context(temp.path(), AdbTool::at(temp.path().join("no-adb")));

            let err = start(&ctx, &strings(&["com.example"]), &ProjectOptions::default())
                .await
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                "You must provide either zero arguments or exactly two arguments."
            );

            let err = stop(&ctx, &strings(&["a", "b"]), &ProjectOptions::default())
                .await
                .unwrap_err();
            assert!(err.to_string().contains("exactly one argument"));
        }

        #[tokio::test]
        async fn test_no_arguments_outside_a_project() {
            let temp = tempdir().unwrap();
            let (ctx, _) = context(temp.path(), AdbTool::at(temp.path().join("no-adb")));

            let err = uninstall(&ctx, &[], &ProjectOptions::default(), false)
                .await
                .unwrap_err();
            assert!(err.is_user_error());

            let err = install(&ctx, &ProjectOptions::default()).await.unwrap_err();
            assert!(err.to_string().contains("Could not find the target app"));
        }

        #[tokio::test]
        #[serial]
        async fn test_stop_reads_app_id_from_gradle_and_caches_it() {
            let temp = tempdir().unwrap();
            let (ctx, captured) = context(temp.path(), fake_adb(temp.path(), ""));
            gradle_project(&ctx);
            let ctx = ctx.with_filter(madb_core::DeviceFilter::from_tokens(["@1"]));

            stop(&ctx, &[], &ProjectOptions::default()).await.unwrap();
            stop(&ctx, &[], &ProjectOptions::default()).await.unwrap();

            assert_eq!(gradle_calls(&ctx).len(), 1);
            assert!(gradle_calls(&ctx)[0].contains("madbExtractVariantProperties"));
            assert!(captured.stdout.contents().contains("NOTE: Cached properties"));
            assert_eq!(
                logged_calls(temp.path()),
                vec![
                    "-s deviceid01 shell am force-stop com.example.app",
                    "-s deviceid01 shell am force-stop com.example.app",
                ]
            );

            let project = ProjectOptions {
                clear_cache: true,
                ..Default::default()
            };
            stop(&ctx, &[], &project).await.unwrap();
            assert_eq!(gradle_calls(&ctx).len(), 2);
        }

        #[tokio::test]
        #[serial]
        async fn test_install_picks_output_per_device() {
            let temp = tempdir().unwrap();
            let (ctx, _) = context(temp.path(), fake_adb(temp.path(), DEVICE_RESPONSES));
            gradle_project(&ctx);

            let err = install(&ctx, &ProjectOptions::default()).await.unwrap_err();

            assert_eq!(
                install_calls(temp.path()),
                vec![
                    "-s deviceid01 install -r /out/app-arm.apk",
                    "-s emulator-5554 install -r /out/app-x86.apk",
                ]
            );
            match err {
                Error::Dispatch(agg) => {
                    assert_eq!(agg.len(), 1);
                    assert_eq!(agg.failures()[0].device, "deviceid02");
                    assert!(matches!(agg.failures()[0].error, Error::NoMatchingOutput { .. }));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        #[serial]
        async fn test_install_only_queries_device_then_force_installs() {
            let temp = tempdir().unwrap();
            let (ctx, _) = context(temp.path(), fake_adb(temp.path(), DEVICE_RESPONSES));
            gradle_project(&ctx);
            ctx.store.update(|cfg| cfg.set_user_id("emulator-5554", "10")).unwrap();
            let ctx = ctx.with_filter(madb_core::DeviceFilter::from_tokens(["emulator-5554"]));

            install(&ctx, &ProjectOptions::default()).await.unwrap();

            assert_eq!(
                logged_calls(temp.path()),
                vec![
                    "-s emulator-5554 install -r --user 10 /out/app-x86.apk",
                    "-s emulator-5554 shell am get-config",
                    "-s emulator-5554 shell getprop",
                ]
            );
        }

        #[tokio::test]
        #[serial]
        async fn test_install_with_build_runs_assemble_once() {
            let temp = tempdir().unwrap();
            let (ctx, _) = context(temp.path(), fake_adb(temp.path(), DEVICE_RESPONSES));
            gradle_project(&ctx);
            let ctx = ctx.with_filter(madb_core::DeviceFilter {
                all_emulators: true,
                ..Default::default()
            });

            let project = ProjectOptions {
                build: true,
                ..Default::default()
            };
            install(&ctx, &project).await.unwrap();

            let calls = gradle_calls(&ctx);
            assert_eq!(calls.len(), 2);
            assert_eq!(calls[1], "--daemon assembleDebug");
            assert_eq!(
                install_calls(temp.path()),
                vec!["-s emulator-5554 install -r /out/app-x86.apk"]
            );
        }
    }
}
