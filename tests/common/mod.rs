//! Shared test fixture: a scripted plotting module over the in-memory
//! backend.
//!
//! Implements just enough `pyplot` surface for the integration suite:
//! figure registration by number, subplot grids, title round-trips, input
//! length validation on the plotting primitives, and a `savefig` that
//! actually writes the target file.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use mplot::runtime::{MockRuntime, RawObject, RuntimeBackend};
use mplot::Runtime;

pub struct FakePyplot {
    pub mock: MockRuntime,
    pub runtime: Runtime,
    /// Last style selected through `style.use`.
    pub style: Arc<Mutex<Option<String>>>,
}

struct Registry {
    figures: BTreeMap<usize, RawObject>,
    current: Option<usize>,
}

type Shared = Arc<Mutex<Registry>>;

/// Install the fake module under `matplotlib.pyplot` and hand back the
/// runtime driving it.
pub fn fake_pyplot() -> FakePyplot {
    let mock = MockRuntime::new();
    let runtime = Runtime::new(mock.clone());
    let registry: Shared = Arc::new(Mutex::new(Registry {
        figures: BTreeMap::new(),
        current: None,
    }));
    let style = Arc::new(Mutex::new(None));

    let module = mock.instance("module");

    // subplots(num=, nrows=, ncols=, squeeze=False) -> (fig, [[axes..]..])
    let reg = Arc::clone(&registry);
    let subplots = mock.native(move |rt, _args, kwargs| {
        let num = kwarg_usize(rt, kwargs, "num").unwrap_or(0);
        let rows = kwarg_usize(rt, kwargs, "nrows").unwrap_or(1);
        let cols = kwarg_usize(rt, kwargs, "ncols").unwrap_or(1);
        let (fig, grid) = new_figure(rt, &reg, num, rows, cols);
        let pair = rt.make_tuple(2);
        rt.tuple_set(pair, 0, fig);
        rt.tuple_set(pair, 1, grid);
        pair
    });
    mock.set_attr(module, "subplots", subplots);
    mock.decref(subplots);

    // figure(num=) -> fig (creating a bare 1x1 figure when unregistered)
    let reg = Arc::clone(&registry);
    let figure = mock.native(move |rt, _args, kwargs| {
        let num = kwarg_usize(rt, kwargs, "num").unwrap_or(0);
        let existing = reg.lock().figures.get(&num).copied();
        match existing {
            Some(fig) => {
                reg.lock().current = Some(num);
                rt.incref(fig);
                fig
            }
            None => {
                let (fig, grid) = new_figure(rt, &reg, num, 1, 1);
                rt.decref(grid);
                fig
            }
        }
    });
    mock.set_attr(module, "figure", figure);
    mock.decref(figure);

    // gca() -> first axes of the current figure
    let reg = Arc::clone(&registry);
    let gca = mock.native(move |rt, _args, _kwargs| {
        let state = reg.lock();
        let fig = state.current.and_then(|id| state.figures.get(&id).copied());
        drop(state);
        match fig.and_then(|fig| rt.get_attr(fig, "_ax00")) {
            Some(ax) => {
                rt.incref(ax);
                ax
            }
            None => {
                rt.raise("RuntimeError: no current figure");
                RawObject::NULL
            }
        }
    });
    mock.set_attr(module, "gca", gca);
    mock.decref(gca);

    // fignum_exists(id) -> bool
    let reg = Arc::clone(&registry);
    let exists = mock.native(move |rt, args, _kwargs| {
        let id = rt.as_int(args[0]).unwrap_or(-1);
        let known = id >= 0 && reg.lock().figures.contains_key(&(id as usize));
        rt.make_bool(known)
    });
    mock.set_attr(module, "fignum_exists", exists);
    mock.decref(exists);

    // get_fignums() -> sorted list of ints
    let reg = Arc::clone(&registry);
    let fignums = mock.native(move |rt, _args, _kwargs| {
        let ids: Vec<usize> = reg.lock().figures.keys().copied().collect();
        let list = rt.make_list(ids.len());
        for (index, id) in ids.into_iter().enumerate() {
            rt.list_set(list, index, rt.make_int(id as i64));
        }
        list
    });
    mock.set_attr(module, "get_fignums", fignums);
    mock.decref(fignums);

    // close(id | "all")
    let reg = Arc::clone(&registry);
    let close = mock.native(move |rt, args, _kwargs| {
        let mut state = reg.lock();
        let removed: Vec<RawObject> = if rt.as_str(args[0]).as_deref() == Some("all") {
            state.current = None;
            std::mem::take(&mut state.figures).into_values().collect()
        } else if let Some(id) = rt.as_int(args[0]) {
            let id = id as usize;
            if state.current == Some(id) {
                state.current = None;
            }
            state.figures.remove(&id).into_iter().collect()
        } else {
            drop(state);
            rt.raise("TypeError: close() argument must be an int or 'all'");
            return RawObject::NULL;
        };
        drop(state);
        for fig in removed {
            rt.decref(fig);
        }
        rt.none()
    });
    mock.set_attr(module, "close", close);
    mock.decref(close);

    // show(block=?)
    let show = mock.native(|rt, _args, _kwargs| rt.none());
    mock.set_attr(module, "show", show);
    mock.decref(show);

    // colorbar(mappable=, ax=)
    let colorbar = mock.native(|rt, _args, kwargs| {
        if kwargs.is_null()
            || rt.dict_get(kwargs, "mappable").is_none()
            || rt.dict_get(kwargs, "ax").is_none()
        {
            rt.raise("TypeError: colorbar() requires mappable and ax");
            return RawObject::NULL;
        }
        rt.instance("Colorbar")
    });
    mock.set_attr(module, "colorbar", colorbar);
    mock.decref(colorbar);

    // style.use(name)
    let style_obj = mock.instance("StyleModule");
    let chosen = Arc::clone(&style);
    let style_use = mock.native(move |rt, args, _kwargs| {
        match rt.as_str(args[0]) {
            Some(name) => {
                *chosen.lock() = Some(name);
                rt.none()
            }
            None => {
                rt.raise("TypeError: style name must be a string");
                RawObject::NULL
            }
        }
    });
    mock.set_attr(style_obj, "use", style_use);
    mock.decref(style_use);
    mock.set_attr(module, "style", style_obj);
    mock.decref(style_obj);

    mock.register_module("matplotlib.pyplot", module);
    mock.decref(module);

    FakePyplot {
        mock,
        runtime,
        style,
    }
}

/// Build a figure instance plus its axes grid; registers the number and
/// makes it current. Returns two new references: `(fig, grid)`.
fn new_figure(
    rt: &MockRuntime,
    registry: &Shared,
    num: usize,
    rows: usize,
    cols: usize,
) -> (RawObject, RawObject) {
    let fig = rt.instance("Figure");

    // suptitle(text) / get_suptitle()
    let owner = fig;
    let suptitle = rt.native(move |rt, args, _kwargs| {
        rt.set_attr(owner, "_suptitle", args[0]);
        rt.none()
    });
    rt.set_attr(fig, "suptitle", suptitle);
    rt.decref(suptitle);

    let owner = fig;
    let get_suptitle = rt.native(move |rt, _args, _kwargs| match rt.get_attr(owner, "_suptitle") {
        Some(text) => {
            rt.incref(text);
            text
        }
        None => rt.make_str(""),
    });
    rt.set_attr(fig, "get_suptitle", get_suptitle);
    rt.decref(get_suptitle);

    // savefig(path): writes the target file, like the real renderer would.
    let savefig = rt.native(|rt, args, _kwargs| match rt.as_str(args[0]) {
        Some(path) => match std::fs::write(&path, b"") {
            Ok(()) => rt.none(),
            Err(err) => {
                rt.raise(format!("OSError: cannot write '{}': {}", path, err));
                RawObject::NULL
            }
        },
        None => {
            rt.raise("TypeError: savefig() path must be a string");
            RawObject::NULL
        }
    });
    rt.set_attr(fig, "savefig", savefig);
    rt.decref(savefig);

    // Axes grid, row-major.
    let grid = rt.make_list(rows);
    for row in 0..rows {
        let line = rt.make_list(cols);
        for col in 0..cols {
            let ax = new_axes(rt);
            if row == 0 && col == 0 {
                rt.set_attr(fig, "_ax00", ax);
            }
            rt.list_set(line, col, ax);
        }
        rt.list_set(grid, row, line);
    }

    let mut state = registry.lock();
    rt.incref(fig);
    if let Some(old) = state.figures.insert(num, fig) {
        rt.decref(old);
    }
    state.current = Some(num);
    drop(state);

    (fig, grid)
}

/// Build one axes instance with validating plotting primitives.
fn new_axes(rt: &MockRuntime) -> RawObject {
    let ax = rt.instance("Axes");

    // plot(y) / plot(x, y): parallel inputs must agree in length.
    let plot = rt.native(|rt, args, _kwargs| {
        if args.len() == 2 && !same_length(rt, args[0], args[1]) {
            rt.raise("ValueError: x and y must have same first dimension");
            return RawObject::NULL;
        }
        rt.instance("Line2D")
    });
    rt.set_attr(ax, "plot", plot);
    rt.decref(plot);

    let bar = rt.native(|rt, args, _kwargs| {
        if args.len() == 2 && !same_length(rt, args[0], args[1]) {
            rt.raise("ValueError: shape mismatch between bar positions and heights");
            return RawObject::NULL;
        }
        rt.instance("BarContainer")
    });
    rt.set_attr(ax, "bar", bar);
    rt.decref(bar);

    let scatter = rt.native(|rt, args, _kwargs| {
        if args.len() == 2 && !same_length(rt, args[0], args[1]) {
            rt.raise("ValueError: x and y must be the same size");
            return RawObject::NULL;
        }
        rt.instance("PathCollection")
    });
    rt.set_attr(ax, "scatter", scatter);
    rt.decref(scatter);

    let hist = rt.native(|rt, _args, _kwargs| rt.instance("HistResult"));
    rt.set_attr(ax, "hist", hist);
    rt.decref(hist);

    let fill = rt.native(|rt, args, _kwargs| {
        if args.len() == 2 && !same_length(rt, args[0], args[1]) {
            rt.raise("ValueError: x and y must be the same size");
            return RawObject::NULL;
        }
        rt.instance("Polygon")
    });
    rt.set_attr(ax, "fill", fill);
    rt.decref(fill);

    // imshow(grid) -> mappable; the grid itself is recorded for assertions.
    let owner = ax;
    let imshow = rt.native(move |rt, args, _kwargs| {
        rt.set_attr(owner, "_image", args[0]);
        rt.instance("AxesImage")
    });
    rt.set_attr(ax, "imshow", imshow);
    rt.decref(imshow);

    // set_title(text) / get_title()
    let owner = ax;
    let set_title = rt.native(move |rt, args, _kwargs| {
        rt.set_attr(owner, "_title", args[0]);
        rt.none()
    });
    rt.set_attr(ax, "set_title", set_title);
    rt.decref(set_title);

    let owner = ax;
    let get_title = rt.native(move |rt, _args, _kwargs| match rt.get_attr(owner, "_title") {
        Some(text) => {
            rt.incref(text);
            text
        }
        None => rt.make_str(""),
    });
    rt.set_attr(ax, "get_title", get_title);
    rt.decref(get_title);

    for (method, attr) in [("set_xlabel", "_xlabel"), ("set_ylabel", "_ylabel")] {
        let owner = ax;
        let setter = rt.native(move |rt, args, _kwargs| {
            rt.set_attr(owner, attr, args[0]);
            rt.none()
        });
        rt.set_attr(ax, method, setter);
        rt.decref(setter);
    }

    // set_xticks(ticks, labels=?): label count must match tick count.
    for method in ["set_xticks", "set_yticks"] {
        let ticks_setter = rt.native(|rt, args, kwargs| {
            if !kwargs.is_null() {
                if let Some(labels) = rt.dict_get(kwargs, "labels") {
                    if !same_length(rt, args[0], labels) {
                        rt.raise(
                            "ValueError: The number of FixedLocator locations does not \
                             match the number of labels",
                        );
                        return RawObject::NULL;
                    }
                }
            }
            rt.none()
        });
        rt.set_attr(ax, method, ticks_setter);
        rt.decref(ticks_setter);
    }

    let legend = rt.native(|rt, _args, _kwargs| rt.instance("Legend"));
    rt.set_attr(ax, "legend", legend);
    rt.decref(legend);

    ax
}

fn same_length(rt: &MockRuntime, a: RawObject, b: RawObject) -> bool {
    rt.seq_len(a).is_some() && rt.seq_len(a) == rt.seq_len(b)
}

fn kwarg_usize(rt: &MockRuntime, kwargs: RawObject, key: &str) -> Option<usize> {
    if kwargs.is_null() {
        return None;
    }
    rt.dict_get(kwargs, key)
        .and_then(|value| rt.as_int(value))
        .map(|value| value as usize)
}
