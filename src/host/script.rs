// Embedded Lua scripting for execute_code.
// Each call gets a fresh Lua 5.4 state with `print` captured and a global
// `scene` table bound to the host's scene. Scene changes made before a
// script raises are kept.

use std::cell::RefCell;
use std::rc::Rc;

use mlua::{Function, Lua, Variadic};
use thiserror::Error;

use super::scene::{ObjectKind, Scene, Transform};

/// A script failed to load or raised while running
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ScriptError {
    pub message: String,
    /// Output printed before the failure
    pub output: String,
}

/// Run `code` against `scene`, returning everything it printed
pub fn run(scene: &mut Scene, code: &str) -> Result<String, ScriptError> {
    let shared = Rc::new(RefCell::new(std::mem::take(scene)));
    let output = Rc::new(RefCell::new(String::new()));

    let result = {
        let lua = Lua::new();
        install(&lua, &shared, &output).and_then(|()| lua.load(code).set_name("execute_code").exec())
    };

    // The Lua state is gone, so this is the last handle to the scene
    *scene = match Rc::try_unwrap(shared) {
        Ok(cell) => cell.into_inner(),
        Err(rc) => {
            let copy = rc.borrow().clone();
            copy
        }
    };
    let output = output.take();

    match result {
        Ok(()) => Ok(output),
        Err(e) => Err(ScriptError {
            message: e.to_string(),
            output,
        }),
    }
}

fn install(lua: &Lua, scene: &Rc<RefCell<Scene>>, output: &Rc<RefCell<String>>) -> mlua::Result<()> {
    let globals = lua.globals();
    let tostring: Function = globals.get("tostring")?;

    let out = Rc::clone(output);
    let print = lua.create_function(move |_, args: Variadic<mlua::Value>| {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args.iter() {
            parts.push(tostring.call::<String>(arg.clone())?);
        }
        let mut out = out.borrow_mut();
        out.push_str(&parts.join("\t"));
        out.push('\n');
        Ok(())
    })?;
    globals.set("print", print)?;

    // Scripts run inside the host process; exiting must come back as an error
    let os: mlua::Table = globals.get("os")?;
    os.set(
        "exit",
        lua.create_function(|_, _: mlua::MultiValue| -> mlua::Result<()> {
            Err(mlua::Error::runtime("os.exit is not available in the host"))
        })?,
    )?;

    let table = lua.create_table()?;

    let s = Rc::clone(scene);
    table.set(
        "objects",
        lua.create_function(move |lua, ()| {
            let names: Vec<String> = s.borrow().objects().iter().map(|o| o.name.clone()).collect();
            lua.create_sequence_from(names)
        })?,
    )?;

    let s = Rc::clone(scene);
    table.set(
        "get_location",
        lua.create_function(move |_, name: String| {
            let scene = s.borrow();
            let obj = scene.get(&name).ok_or_else(|| missing(&name))?;
            let [x, y, z] = obj.transform.location;
            Ok((x, y, z))
        })?,
    )?;

    let s = Rc::clone(scene);
    table.set(
        "set_location",
        lua.create_function(move |_, (name, x, y, z): (String, f64, f64, f64)| {
            let mut scene = s.borrow_mut();
            let obj = scene.get_mut(&name).ok_or_else(|| missing(&name))?;
            obj.transform.location = [x, y, z];
            Ok(())
        })?,
    )?;

    let s = Rc::clone(scene);
    table.set(
        "create",
        lua.create_function(move |_, (kind, name): (String, Option<String>)| {
            let kind: ObjectKind = kind.parse().map_err(mlua::Error::runtime)?;
            let name = name.unwrap_or_else(|| kind.default_name().to_string());
            Ok(s.borrow_mut().add_object(&name, kind, Transform::default()))
        })?,
    )?;

    let s = Rc::clone(scene);
    table.set(
        "delete",
        lua.create_function(move |_, name: String| {
            s.borrow_mut().remove(&name).map(|_| ()).ok_or_else(|| missing(&name))
        })?,
    )?;

    let s = Rc::clone(scene);
    table.set(
        "set_visible",
        lua.create_function(move |_, (name, visible): (String, bool)| {
            let mut scene = s.borrow_mut();
            let obj = scene.get_mut(&name).ok_or_else(|| missing(&name))?;
            obj.visible = visible;
            Ok(())
        })?,
    )?;

    let s = Rc::clone(scene);
    table.set(
        "set_material",
        lua.create_function(
            move |_, (name, material, r, g, b): (String, String, f32, f32, f32)| {
                let mut scene = s.borrow_mut();
                if !scene.contains(&name) {
                    return Err(missing(&name));
                }
                scene.upsert_material(&material, [r, g, b, 1.0]);
                scene.assign_material(&name, &material);
                Ok(())
            },
        )?,
    )?;

    globals.set("scene", table)?;
    Ok(())
}

fn missing(name: &str) -> mlua::Error {
    mlua::Error::runtime(format!("object not found: {}", name))
}
